//! Sync passes: backfill (full history, newest first) and update (only messages above the cursor).
//!
//! A pass pulls pages from the [`MessageSource`], normalizes each message and commits it in its
//! own transaction, so an interrupted pass loses at most the message in flight and the next pass
//! resumes without duplicates. Entities are processed one at a time.
//!
//! The update pass assumes message ids grow monotonically per entity: it stops at the first id
//! at or below the highest stored one.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use archive_core::{Entity, MessageSource, SourceError};
use serde::Serialize;
use storage::{ArchiveLayout, ArchiveStore, MigrationReport, StoreOptions};
use tracing::{debug, error, info, trace, warn};

use crate::digest::DigestRenderer;
use crate::error::SyncError;
use crate::normalizer::Normalizer;

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Maximum number of messages to fetch; `None` for the whole history.
    pub limit: Option<usize>,
    pub download_media: bool,
    pub page_size: usize,
    /// Render the HTML digest at the end of the pass.
    pub render_digest: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: None,
            download_media: false,
            page_size: DEFAULT_PAGE_SIZE,
            render_digest: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncMode {
    Backfill,
    Update,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Backfill => f.write_str("backfill"),
            SyncMode::Update => f.write_str("update"),
        }
    }
}

/// Lifecycle of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Init,
    CursorResolved,
    Fetching,
    Committing,
    Done,
    Failed,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Done | SyncState::Failed)
    }

    /// Whether `self -> next` is a legal transition for a pass of `mode`.
    pub fn can_advance_to(self, next: SyncState, mode: SyncMode) -> bool {
        use SyncState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Failed) => true,
            (Init, CursorResolved) => mode == SyncMode::Update,
            (Init, Fetching) => mode == SyncMode::Backfill,
            (CursorResolved, Fetching) => true,
            (Fetching, Fetching | Committing | Done) => true,
            (Committing, Fetching | Done) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct PassState {
    entity_id: i64,
    mode: SyncMode,
    state: SyncState,
}

impl PassState {
    fn new(entity_id: i64, mode: SyncMode) -> Self {
        Self {
            entity_id,
            mode,
            state: SyncState::Init,
        }
    }

    fn advance(&mut self, next: SyncState) {
        debug_assert!(
            self.state.can_advance_to(next, self.mode),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(entity_id = self.entity_id, from = ?self.state, to = ?next, "Sync state");
        self.state = next;
    }
}

/// How a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PassOutcome {
    /// The source ran out of history.
    Completed,
    /// The requested message limit was reached.
    LimitReached,
    /// The update pass reached the stored cursor.
    CaughtUp,
    /// The source denied access mid-pass; rows committed so far are kept.
    Aborted { reason: String },
    /// The entity was not processed at all.
    Skipped { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub entity_id: i64,
    pub mode: SyncMode,
    pub outcome: PassOutcome,
    /// Messages taken from the source and handed to the normalizer.
    pub fetched: usize,
    /// New message rows written.
    pub committed: usize,
    /// Messages already stored.
    pub duplicates: usize,
    /// Messages whose commit failed and were skipped.
    pub failed: usize,
    /// Highest stored id at the start of an update pass.
    pub cursor: Option<i64>,
    pub rate_limit_waits: u32,
    pub migration: MigrationReport,
    pub digest: Option<PathBuf>,
}

impl SyncReport {
    fn new(entity_id: i64, mode: SyncMode) -> Self {
        Self {
            entity_id,
            mode,
            outcome: PassOutcome::Completed,
            fetched: 0,
            committed: 0,
            duplicates: 0,
            failed: 0,
            cursor: None,
            rate_limit_waits: 0,
            migration: MigrationReport::default(),
            digest: None,
        }
    }
}

/// Result of [`SyncController::run_all`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub reports: Vec<SyncReport>,
    pub failures: Vec<(i64, String)>,
}

impl BatchSummary {
    pub fn committed(&self) -> usize {
        self.reports.iter().map(|r| r.committed).sum()
    }
}

pub struct SyncController {
    source: Arc<dyn MessageSource>,
    renderer: DigestRenderer,
    store_options: StoreOptions,
}

impl SyncController {
    pub fn new(source: Arc<dyn MessageSource>, layout: ArchiveLayout, store_options: StoreOptions) -> Self {
        Self {
            source,
            renderer: DigestRenderer::new(layout),
            store_options,
        }
    }

    /// Replaces the digest renderer (and with it the archive layout).
    pub fn with_renderer(mut self, renderer: DigestRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn layout(&self) -> &ArchiveLayout {
        self.renderer.layout()
    }

    pub fn store_options(&self) -> &StoreOptions {
        &self.store_options
    }

    /// Opens the entity's store under the controller's layout.
    pub async fn open_store(&self, entity: &Entity) -> Result<ArchiveStore, SyncError> {
        Ok(ArchiveStore::open(self.layout(), entity.id, &entity.display_name, &self.store_options).await?)
    }

    /// Archives the entity's history newest-first, up to `options.limit` messages.
    pub async fn backfill(&self, entity: &Entity, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        self.run_pass(entity, SyncMode::Backfill, options).await
    }

    /// Archives only messages newer than the highest stored id. Without a store file this
    /// becomes a full backfill.
    pub async fn update(&self, entity: &Entity, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let store_path = self.layout().store_path(entity.id, &entity.display_name);
        if entity.accessible && !store_path.exists() {
            info!(
                entity_id = entity.id,
                name = %entity.display_name,
                "No existing store found, creating new backup"
            );
            let full = SyncOptions {
                limit: None,
                ..options.clone()
            };
            return self.run_pass(entity, SyncMode::Backfill, &full).await;
        }
        self.run_pass(entity, SyncMode::Update, options).await
    }

    /// Backfills each entity in turn; a failure is logged and the batch moves on.
    pub async fn run_all(&self, entities: &[Entity], options: &SyncOptions) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for entity in entities {
            match self.backfill(entity, options).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    error!(entity_id = entity.id, name = %entity.display_name, error = %e, "Entity pass failed");
                    summary.failures.push((entity.id, e.to_string()));
                }
            }
        }
        info!(
            entities = entities.len(),
            failed = summary.failures.len(),
            committed = summary.committed(),
            "Batch finished"
        );
        summary
    }

    async fn run_pass(
        &self,
        entity: &Entity,
        mode: SyncMode,
        options: &SyncOptions,
    ) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::new(entity.id, mode);
        if !entity.accessible {
            warn!(
                entity_id = entity.id,
                name = %entity.display_name,
                "Entity is not accessible, it may have been deleted or you lack permission"
            );
            report.outcome = PassOutcome::Skipped {
                reason: "entity not accessible".to_string(),
            };
            return Ok(report);
        }

        info!(entity_id = entity.id, name = %entity.display_name, %mode, "Starting pass");
        let mut pass = PassState::new(entity.id, mode);
        let store = match self.open_store(entity).await {
            Ok(store) => store,
            Err(e) => {
                pass.advance(SyncState::Failed);
                return Err(e);
            }
        };
        report.migration = store.migration().clone();

        if mode == SyncMode::Update {
            let cursor = match store.max_message_id(entity.id).await {
                Ok(max) => max.unwrap_or(0),
                Err(e) => {
                    pass.advance(SyncState::Failed);
                    store.close().await;
                    return Err(e.into());
                }
            };
            info!(entity_id = entity.id, cursor, "Last message in store");
            report.cursor = Some(cursor);
            pass.advance(SyncState::CursorResolved);
        }

        let failure = self.pull(entity, options, &store, &mut pass, &mut report).await;

        if options.render_digest {
            let stem = ArchiveLayout::entity_stem(entity.id, &entity.display_name);
            let path = self.layout().digest_path(&stem);
            match self
                .renderer
                .render_to_file(&store, &entity.display_name, Some(entity.id), &path)
                .await
            {
                Ok(_) => report.digest = Some(path),
                Err(e) => warn!(entity_id = entity.id, error = %e, "Failed to render digest"),
            }
        }
        store.close().await;

        if let Some(e) = failure {
            error!(entity_id = entity.id, error = %e, "Pass failed");
            return Err(e.into());
        }
        info!(
            entity_id = entity.id,
            %mode,
            outcome = ?report.outcome,
            fetched = report.fetched,
            committed = report.committed,
            duplicates = report.duplicates,
            "Pass finished"
        );
        Ok(report)
    }

    /// Page loop. Returns the source error that ended the pass, if any; every other ending is
    /// recorded as `report.outcome`.
    async fn pull(
        &self,
        entity: &Entity,
        options: &SyncOptions,
        store: &ArchiveStore,
        pass: &mut PassState,
        report: &mut SyncReport,
    ) -> Option<SourceError> {
        let normalizer = Normalizer::new(self.source.as_ref(), self.layout(), options.download_media);
        let page_size = options.page_size.max(1);
        let mut offset_id: Option<i64> = None;
        pass.advance(SyncState::Fetching);

        loop {
            let remaining = options.limit.map(|limit| limit.saturating_sub(report.fetched));
            if remaining == Some(0) {
                report.outcome = PassOutcome::LimitReached;
                pass.advance(SyncState::Done);
                return None;
            }
            let want = remaining.map_or(page_size, |r| r.min(page_size));

            let page = match self.source.fetch_page(entity, offset_id, want).await {
                Ok(page) => page,
                Err(SourceError::RateLimited { wait }) => {
                    report.rate_limit_waits += 1;
                    warn!(
                        entity_id = entity.id,
                        wait_secs = wait.as_secs(),
                        "Rate limited, waiting before continuing"
                    );
                    tokio::time::sleep(wait).await;
                    pass.advance(SyncState::Fetching);
                    continue;
                }
                Err(SourceError::AccessDenied(reason)) => {
                    warn!(
                        entity_id = entity.id,
                        reason = %reason,
                        "Cannot access entity, it may be private or you may have been banned"
                    );
                    report.outcome = PassOutcome::Aborted { reason };
                    pass.advance(SyncState::Done);
                    return None;
                }
                Err(e) => {
                    pass.advance(SyncState::Failed);
                    return Some(e);
                }
            };

            if page.is_empty() {
                report.outcome = PassOutcome::Completed;
                pass.advance(SyncState::Done);
                return None;
            }
            debug!(entity_id = entity.id, offset_id = ?offset_id, count = page.len(), "Fetched page");
            pass.advance(SyncState::Committing);

            for raw in &page {
                if let Some(cursor) = report.cursor {
                    if raw.id <= cursor {
                        report.outcome = PassOutcome::CaughtUp;
                        pass.advance(SyncState::Done);
                        return None;
                    }
                }
                offset_id = Some(raw.id);
                report.fetched += 1;

                let normalized = normalizer.normalize(raw, entity.id, store).await;
                match store.commit(&normalized).await {
                    Ok(true) => report.committed += 1,
                    Ok(false) => report.duplicates += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(entity_id = entity.id, message_id = raw.id, error = %e, "Failed to commit message, skipping");
                    }
                }

                if options.limit == Some(report.fetched) {
                    break;
                }
            }
            pass.advance(SyncState::Fetching);
        }
    }
}
