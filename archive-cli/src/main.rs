//! tg-archive: archive conversations into per-entity SQLite stores and HTML digests.
//! Config from env (see `ArchiveConfig`), source selected with `--export`.

use anyhow::Result;
use archive_cli::{run, Cli};
use archiver::ArchiveConfig;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = ArchiveConfig::load()?;
    archive_core::init_tracing(&config.log_file)?;
    config.validate()?;

    run(cli, config).await
}
