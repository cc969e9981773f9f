//! Integration tests for [`SyncController`] backfill and update passes.
//!
//! **BDD style**: Given a mock source with a scripted history, when a pass runs against a
//! temporary archive root, then the store holds exactly the expected rows and the report says
//! how the pass ended.

mod common;

use std::sync::Arc;
use std::time::Duration;

use archive_core::{Entity, EntityKind, SourceError};
use archiver::{
    Digest, DigestRenderer, DigestTemplate, PassOutcome, SyncController, SyncError, SyncMode,
    SyncOptions,
};
use common::mock_source::{entity, history, MockSource, PageRequest};
use storage::{ArchiveLayout, ArchiveStore, StoreOptions};
use tempfile::TempDir;

fn controller(source: Arc<MockSource>, dir: &TempDir) -> SyncController {
    SyncController::new(source, ArchiveLayout::new(dir.path()), StoreOptions::default())
}

fn options(page_size: usize) -> SyncOptions {
    SyncOptions {
        page_size,
        render_digest: false,
        ..SyncOptions::default()
    }
}

async fn stored_ids(dir: &TempDir, entity: &Entity) -> Vec<i64> {
    let layout = ArchiveLayout::new(dir.path());
    let store = ArchiveStore::open(&layout, entity.id, &entity.display_name, &StoreOptions::default())
        .await
        .unwrap();
    let mut ids: Vec<i64> = store
        .messages(Some(entity.id))
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect();
    ids.sort();
    store.close().await;
    ids
}

/// **Test: Backfill twice is idempotent**
///
/// **Setup:** Mock source with 5 messages for one entity.
/// **Action:** Run backfill two times.
/// **Expected:** First pass commits 5; second commits 0 and sees 5 duplicates; store holds 5 rows.
#[tokio::test]
async fn test_backfill_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(5)));
    let sync = controller(source.clone(), &dir);

    let first = sync.backfill(&chat, &options(2)).await.unwrap();
    assert_eq!(first.mode, SyncMode::Backfill);
    assert_eq!(first.outcome, PassOutcome::Completed);
    assert_eq!(first.fetched, 5);
    assert_eq!(first.committed, 5);

    let second = sync.backfill(&chat, &options(2)).await.unwrap();
    assert_eq!(second.committed, 0);
    assert_eq!(second.duplicates, 5);

    assert_eq!(stored_ids(&dir, &chat).await, vec![1, 2, 3, 4, 5]);
}

/// **Test: Paging walks newest-first with a moving offset**
///
/// **Setup:** 5 messages, page size 2.
/// **Action:** Backfill.
/// **Expected:** Requests use offsets None, 4, 2, 1 (the last returns an empty page).
#[tokio::test]
async fn test_backfill_pages_by_offset() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(5)));
    let sync = controller(source.clone(), &dir);

    sync.backfill(&chat, &options(2)).await.unwrap();

    let offsets: Vec<Option<i64>> = source.requests().iter().map(|r| r.offset_id).collect();
    assert_eq!(offsets, vec![None, Some(4), Some(2), Some(1)]);
}

/// **Test: Limit stops the pass**
///
/// **Setup:** 5 messages, page size 2, limit 3.
/// **Action:** Backfill.
/// **Expected:** Newest 3 committed; second request asks for 1 message; outcome LimitReached.
#[tokio::test]
async fn test_backfill_respects_limit() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(5)));
    let sync = controller(source.clone(), &dir);

    let report = sync
        .backfill(
            &chat,
            &SyncOptions {
                limit: Some(3),
                ..options(2)
            },
        )
        .await
        .unwrap();

    assert_eq!(report.outcome, PassOutcome::LimitReached);
    assert_eq!(report.committed, 3);
    let limits: Vec<usize> = source.requests().iter().map(|r| r.limit).collect();
    assert_eq!(limits, vec![2, 1]);
    assert_eq!(stored_ids(&dir, &chat).await, vec![3, 4, 5]);
}

/// **Test: Update commits only messages above the cursor**
///
/// **Setup:** Store holds ids 1..=5; source then receives 6 and 7.
/// **Action:** Update pass.
/// **Expected:** Cursor 5, exactly 2 committed, outcome CaughtUp, store holds 1..=7.
#[tokio::test]
async fn test_update_resumes_from_cursor() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(5)));
    let sync = controller(source.clone(), &dir);
    sync.backfill(&chat, &options(10)).await.unwrap();

    let mut newer = history(7);
    newer.retain(|m| m.id > 5);
    source.add_messages(chat.id, newer);

    let report = sync.update(&chat, &options(10)).await.unwrap();
    assert_eq!(report.mode, SyncMode::Update);
    assert_eq!(report.cursor, Some(5));
    assert_eq!(report.committed, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.outcome, PassOutcome::CaughtUp);
    assert_eq!(stored_ids(&dir, &chat).await, vec![1, 2, 3, 4, 5, 6, 7]);
}

/// **Test: Update without a store falls back to backfill**
///
/// **Setup:** Empty archive root, 4 messages at the source.
/// **Action:** Update pass with a limit of 1.
/// **Expected:** Runs as backfill without the limit; all 4 committed.
#[tokio::test]
async fn test_update_without_store_backfills() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(4)));
    let sync = controller(source, &dir);

    let report = sync
        .update(
            &chat,
            &SyncOptions {
                limit: Some(1),
                ..options(10)
            },
        )
        .await
        .unwrap();

    assert_eq!(report.mode, SyncMode::Backfill);
    assert_eq!(report.cursor, None);
    assert_eq!(report.committed, 4);
}

/// **Test: Rate limit is waited out and the same page retried**
///
/// **Setup:** 5 messages, page size 2; the second fetch is rate limited for 10 ms.
/// **Action:** Backfill.
/// **Expected:** One wait recorded; the retry repeats the failed request; all 5 committed once.
#[tokio::test]
async fn test_rate_limit_resumes_same_page() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(
        MockSource::new()
            .with_messages(chat.id, history(5))
            .fail_on_call(
                1,
                SourceError::RateLimited {
                    wait: Duration::from_millis(10),
                },
            ),
    );
    let sync = controller(source.clone(), &dir);

    let report = sync.backfill(&chat, &options(2)).await.unwrap();

    assert_eq!(report.rate_limit_waits, 1);
    assert_eq!(report.committed, 5);
    assert_eq!(report.duplicates, 0);
    let requests = source.requests();
    assert_eq!(requests[1], requests[2]);
    assert_eq!(
        requests[1],
        PageRequest {
            entity_id: chat.id,
            offset_id: Some(4),
            limit: 2
        }
    );
    assert_eq!(stored_ids(&dir, &chat).await, vec![1, 2, 3, 4, 5]);
}

/// **Test: Access denied aborts the pass but keeps committed rows**
///
/// **Setup:** 5 messages, page size 2; the second fetch is denied.
/// **Action:** Backfill with digest rendering on.
/// **Expected:** Outcome Aborted, the first page (5, 4) stays committed, digest still written.
#[tokio::test]
async fn test_access_denied_aborts_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(
        MockSource::new()
            .with_messages(chat.id, history(5))
            .fail_on_call(1, SourceError::AccessDenied("banned".into())),
    );
    let sync = controller(source.clone(), &dir);

    let report = sync
        .backfill(
            &chat,
            &SyncOptions {
                render_digest: true,
                ..options(2)
            },
        )
        .await
        .unwrap();

    assert_eq!(
        report.outcome,
        PassOutcome::Aborted {
            reason: "banned".into()
        }
    );
    assert_eq!(report.committed, 2);
    assert_eq!(source.fetch_calls(), 2);
    assert_eq!(stored_ids(&dir, &chat).await, vec![4, 5]);
    let digest = report.digest.unwrap();
    assert!(digest.ends_with("100_Team Chat.html"));
    assert!(digest.exists());
}

/// **Test: Transport failure fails the entity but still renders the digest**
///
/// **Setup:** First fetch fails with a transport error.
/// **Action:** Backfill with digest rendering on.
/// **Expected:** `SyncError::Source`; the store file and digest exist.
#[tokio::test]
async fn test_transport_error_fails_pass() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(
        MockSource::new()
            .with_messages(chat.id, history(2))
            .fail_on_call(0, SourceError::Transport("connection reset".into())),
    );
    let sync = controller(source, &dir);

    let err = sync
        .backfill(
            &chat,
            &SyncOptions {
                render_digest: true,
                ..options(10)
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::Source(SourceError::Transport(_))));
    assert!(dir.path().join("100_Team Chat.db").exists());
    assert!(dir.path().join("100_Team Chat.html").exists());
}

/// **Test: Inaccessible entities are skipped without a store**
///
/// **Setup:** Entity flagged inaccessible.
/// **Action:** Backfill and update.
/// **Expected:** Both report Skipped; no fetch, no store file.
#[tokio::test]
async fn test_inaccessible_entity_is_skipped() {
    let dir = TempDir::new().unwrap();
    let gone = Entity::new(50, "ID: 50", EntityKind::Unknown, false);
    let source = Arc::new(MockSource::new());
    let sync = controller(source.clone(), &dir);

    let report = sync.backfill(&gone, &options(10)).await.unwrap();
    assert!(matches!(report.outcome, PassOutcome::Skipped { .. }));
    let report = sync.update(&gone, &options(10)).await.unwrap();
    assert!(matches!(report.outcome, PassOutcome::Skipped { .. }));

    assert_eq!(source.fetch_calls(), 0);
    assert!(!dir.path().join("50_ID_ 50.db").exists());
}

/// **Test: Batch keeps going after a failed entity**
///
/// **Setup:** Two entities; the first fetch (first entity) fails with a transport error.
/// **Action:** run_all.
/// **Expected:** One failure recorded for the first entity, the second entity fully archived.
#[tokio::test]
async fn test_run_all_continues_after_failure() {
    let dir = TempDir::new().unwrap();
    let first = entity(1, "First");
    let second = entity(2, "Second");
    let source = Arc::new(
        MockSource::new()
            .with_messages(first.id, history(2))
            .with_messages(second.id, history(3))
            .fail_on_call(0, SourceError::Transport("timeout".into())),
    );
    let sync = controller(source, &dir);

    let summary = sync
        .run_all(&[first.clone(), second.clone()], &options(10))
        .await;

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, first.id);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].entity_id, second.id);
    assert_eq!(summary.committed(), 3);
}

/// **Test: Digest is rendered at the end of a pass**
///
/// **Setup:** 3 messages.
/// **Action:** Backfill with default options.
/// **Expected:** `<root>/100_Team Chat.html` exists and contains the message texts.
#[tokio::test]
async fn test_pass_renders_digest() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(3)));
    let sync = controller(source, &dir);

    let report = sync.backfill(&chat, &SyncOptions::default()).await.unwrap();

    let path = report.digest.unwrap();
    let html = std::fs::read_to_string(path).unwrap();
    assert!(html.contains("<title>Team Chat</title>"));
    assert!(html.contains("message 3"));
    assert!(html.contains("March 01, 2024"));
}

struct CountTemplate;

impl DigestTemplate for CountTemplate {
    fn render(&self, digest: &Digest) -> Result<String, std::fmt::Error> {
        Ok(format!("{}: {} messages", digest.title, digest.message_count()))
    }
}

/// **Test: A pass renders through a replaced digest renderer**
///
/// **Setup:** 4 messages; controller built with a renderer using a plain-text template.
/// **Action:** Backfill with default options.
/// **Expected:** The digest file holds the template's output.
#[tokio::test]
async fn test_pass_uses_replaced_renderer() {
    let dir = TempDir::new().unwrap();
    let chat = entity(100, "Team Chat");
    let source = Arc::new(MockSource::new().with_messages(chat.id, history(4)));
    let renderer = DigestRenderer::with_template(ArchiveLayout::new(dir.path()), CountTemplate);
    let sync = controller(source, &dir).with_renderer(renderer);

    let report = sync.backfill(&chat, &SyncOptions::default()).await.unwrap();

    let content = std::fs::read_to_string(report.digest.unwrap()).unwrap();
    assert_eq!(content, "Team Chat: 4 messages");
}
