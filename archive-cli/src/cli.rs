//! CLI parser.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tg-archive")]
#[command(about = "Archive messaging conversations into SQLite stores and HTML digests", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Export directory to read dialogs, messages and media from.
    #[arg(long, global = true, value_name = "DIR")]
    pub export: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which catalog entities a backfill covers.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
#[group(required = true, multiple = false)]
pub struct Selection {
    /// Flat catalog index (see `entities`).
    #[arg(long)]
    pub index: Option<usize>,
    /// Every accessible entity, one after another.
    #[arg(long)]
    pub all: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the entity catalog and write entities_<phone>.csv.
    Entities {
        #[arg(long)]
        phone: String,
    },
    /// Write contacts_<phone>.csv.
    Contacts {
        #[arg(long)]
        phone: String,
    },
    /// Archive history newest-first.
    Backfill {
        #[command(flatten)]
        selection: Selection,
        /// Stop after this many messages.
        #[arg(long)]
        limit: Option<usize>,
        /// Download media files.
        #[arg(long)]
        media: bool,
    },
    /// Archive messages newer than the last stored one.
    Update {
        #[arg(long)]
        index: usize,
        #[arg(long)]
        media: bool,
    },
    /// Re-render the HTML digest from the store.
    Render {
        #[arg(long)]
        index: usize,
        /// Include every entity found in the store, not only the selected one.
        #[arg(long)]
        all_entities: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backfill_index() {
        let cli = Cli::try_parse_from([
            "tg-archive", "--export", "/tmp/export", "backfill", "--index", "3", "--limit", "50",
            "--media",
        ])
        .unwrap();
        assert_eq!(cli.export, Some(PathBuf::from("/tmp/export")));
        match cli.command {
            Commands::Backfill {
                selection,
                limit,
                media,
            } => {
                assert_eq!(selection.index, Some(3));
                assert!(!selection.all);
                assert_eq!(limit, Some(50));
                assert!(media);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_backfill_needs_exactly_one_selection() {
        assert!(Cli::try_parse_from(["tg-archive", "backfill"]).is_err());
        assert!(Cli::try_parse_from(["tg-archive", "backfill", "--index", "1", "--all"]).is_err());
        assert!(Cli::try_parse_from(["tg-archive", "backfill", "--all"]).is_ok());
    }

    #[test]
    fn test_global_export_after_subcommand() {
        let cli = Cli::try_parse_from(["tg-archive", "render", "--index", "0", "--export", "dir"])
            .unwrap();
        assert_eq!(cli.export, Some(PathBuf::from("dir")));
    }
}
