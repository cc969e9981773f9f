//! Command handlers: build the source, catalog and controller, then run one subcommand.

use std::sync::Arc;

use anyhow::{Context, Result};
use archive_core::{Entity, EntityKind, MessageSource};
use archiver::{
    write_contacts, ArchiveConfig, DigestRenderer, EntityCatalog, ExportSource, PassOutcome, SyncController,
    SyncReport,
};
use storage::{ArchiveLayout, ArchiveStore};
use tracing::info;

use crate::cli::{Cli, Commands, Selection};

async fn open_source(cli: &Cli) -> Result<Arc<dyn MessageSource>> {
    let dir = cli
        .export
        .as_ref()
        .context("No message source configured: pass --export <DIR> pointing at an export directory")?;
    let source = ExportSource::open(dir)
        .await
        .with_context(|| format!("Open export directory {}", dir.display()))?;
    Ok(Arc::new(source))
}

fn select(catalog: &EntityCatalog, index: usize) -> Result<&Entity> {
    catalog.get(index).with_context(|| {
        format!(
            "Invalid index {}: the catalog has {} entities (see `tg-archive entities`)",
            index,
            catalog.len()
        )
    })
}

fn print_report(entity: &Entity, report: &SyncReport) {
    let outcome = match &report.outcome {
        PassOutcome::Completed => "completed".to_string(),
        PassOutcome::LimitReached => "limit reached".to_string(),
        PassOutcome::CaughtUp => "up to date".to_string(),
        PassOutcome::Aborted { reason } => format!("aborted ({})", reason),
        PassOutcome::Skipped { reason } => format!("skipped ({})", reason),
    };
    println!(
        "{} (ID: {}): {} {}, {} new, {} already stored",
        entity.display_name, entity.id, report.mode, outcome, report.committed, report.duplicates
    );
    if let Some(path) = &report.digest {
        println!("HTML digest: {}", path.display());
    }
}

pub async fn run(cli: Cli, config: ArchiveConfig) -> Result<()> {
    let source = open_source(&cli).await?;
    let layout = config.layout();
    layout
        .ensure_root()
        .with_context(|| format!("Create output folder {}", layout.root().display()))?;

    match &cli.command {
        Commands::Entities { phone } => {
            let catalog = EntityCatalog::fetch(source.as_ref()).await?;
            for kind in EntityKind::ALL {
                let mut bucket = catalog.bucket(kind).peekable();
                if bucket.peek().is_none() {
                    continue;
                }
                println!("\n{}:", kind.label());
                for (index, entity) in bucket {
                    println!("{}. {} (ID: {})", index, entity.display_name, entity.id);
                }
            }
            let path = layout.entities_path(phone);
            let rows = catalog.write_listing(&path)?;
            println!("\n{} entities saved to {}", rows, path.display());
        }
        Commands::Contacts { phone } => {
            let contacts = source.contacts().await?;
            let path = layout.contacts_path(phone);
            let rows = write_contacts(&contacts, &path)?;
            for row in &rows {
                println!("{}. {} | {} | {}", row.index, row.name, row.phone, row.username);
            }
            println!("\n{} contacts saved to {}", rows.len(), path.display());
        }
        Commands::Backfill {
            selection,
            limit,
            media,
        } => {
            let catalog = EntityCatalog::fetch(source.as_ref()).await?;
            let sync = SyncController::new(source.clone(), layout.clone(), config.store_options());
            let options = config.sync_options(*limit, *media);
            match selection {
                Selection { index: Some(index), .. } => {
                    let entity = select(&catalog, *index)?;
                    let report = sync.backfill(entity, &options).await?;
                    print_report(entity, &report);
                }
                _ => {
                    let summary = sync.run_all(catalog.entities(), &options).await;
                    for report in &summary.reports {
                        if let Some(entity) = catalog.entities().iter().find(|e| e.id == report.entity_id) {
                            print_report(entity, report);
                        }
                    }
                    for (entity_id, error) in &summary.failures {
                        println!("ID {}: failed: {}", entity_id, error);
                    }
                }
            }
        }
        Commands::Update { index, media } => {
            let catalog = EntityCatalog::fetch(source.as_ref()).await?;
            let entity = select(&catalog, *index)?;
            let sync = SyncController::new(source.clone(), layout.clone(), config.store_options());
            let report = sync.update(entity, &config.sync_options(None, *media)).await?;
            print_report(entity, &report);
        }
        Commands::Render {
            index,
            all_entities,
        } => {
            let catalog = EntityCatalog::fetch(source.as_ref()).await?;
            let entity = select(&catalog, *index)?;
            let store_path = layout.store_path(entity.id, &entity.display_name);
            if !store_path.exists() {
                anyhow::bail!(
                    "No store found for {} at {}; run backfill first",
                    entity.display_name,
                    store_path.display()
                );
            }
            let store = ArchiveStore::open_at(&store_path, &config.store_options()).await?;
            let renderer = DigestRenderer::new(layout.clone());
            let stem = ArchiveLayout::entity_stem(entity.id, &entity.display_name);
            let (path, scope) = if *all_entities {
                (layout.combined_digest_path(&stem), None)
            } else {
                (layout.digest_path(&stem), Some(entity.id))
            };
            let result = renderer
                .render_to_file(&store, &entity.display_name, scope, &path)
                .await;
            store.close().await;
            let digest = result?;
            info!(entity_id = entity.id, messages = digest.message_count(), "Digest rendered");
            println!("HTML digest: {}", path.display());
        }
    }
    Ok(())
}
