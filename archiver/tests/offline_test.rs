//! Integration tests for [`ExportSource`] and an end-to-end pass over an export directory.

use std::path::Path;
use std::sync::Arc;

use archive_core::{Entity, EntityKind, MessageSource, PeerRef, SourceError};
use archiver::{EntityCatalog, ExportSource, PassOutcome, SyncController, SyncOptions};
use storage::{ArchiveLayout, ArchiveStore, StoreOptions};
use tempfile::TempDir;

const DIALOGS: &str = r#"[
    {"type": "user", "id": 10, "first_name": "Ada", "last_name": "Lovelace"},
    {"type": "channel", "id": 20, "title": "News", "broadcast": true},
    {"type": "channel_forbidden", "id": 30, "title": "Gone"}
]"#;

const PEERS: &str = r#"[
    {"peer": {"type": "user", "id": 11}, "first_name": "Bob", "last_name": null, "title": null}
]"#;

const NEWS: &str = r#"[
    {"id": 1, "date": "2024-03-01T09:00:00Z", "text": "hello",
     "peer_id": {"type": "channel", "id": 20}},
    {"id": 3, "date": "2024-03-02T09:00:00Z", "text": null,
     "action": {"kind": "MessageActionChatAddUser", "users": [11]}},
    {"id": 2, "date": "2024-03-01T12:00:00Z", "text": "photo",
     "media": {"type": "photo", "file_name": "sunset.jpg"}}
]"#;

fn write_export(dir: &Path) {
    std::fs::create_dir_all(dir.join("messages")).unwrap();
    std::fs::create_dir_all(dir.join("files")).unwrap();
    std::fs::write(dir.join("dialogs.json"), DIALOGS).unwrap();
    std::fs::write(dir.join("peers.json"), PEERS).unwrap();
    std::fs::write(dir.join("messages").join("20.json"), NEWS).unwrap();
    std::fs::write(dir.join("files").join("sunset.jpg"), b"jpeg bytes").unwrap();
}

fn news() -> Entity {
    Entity::new(20, "News", EntityKind::Channel, true)
}

#[tokio::test]
async fn test_open_requires_dialogs() {
    let dir = TempDir::new().unwrap();
    let result = ExportSource::open(dir.path()).await;
    assert!(matches!(result, Err(SourceError::NotFound(_))));
}

#[tokio::test]
async fn test_catalog_and_lookups() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path());
    let source = ExportSource::open(dir.path()).await.unwrap();

    let catalog = EntityCatalog::fetch(&source).await.unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.get(0).unwrap().display_name, "Ada Lovelace");
    assert!(!catalog.get(2).unwrap().accessible);

    assert_eq!(
        source.resolve_user(11).await.unwrap().full_name().as_deref(),
        Some("Bob")
    );
    assert_eq!(
        source.resolve_peer(&PeerRef::Channel(20)).await.unwrap().title.as_deref(),
        Some("News")
    );
    assert!(source.resolve_user(99).await.is_err());
    assert!(source.contacts().await.unwrap().is_empty());
}

/// **Test: Pages come newest-first below the offset**
#[tokio::test]
async fn test_fetch_page_orders_and_offsets() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path());
    let source = ExportSource::open(dir.path()).await.unwrap();

    let page = source.fetch_page(&news(), None, 2).await.unwrap();
    let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![3, 2]);

    let page = source.fetch_page(&news(), Some(2), 2).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 1);

    let missing = Entity::new(10, "Ada Lovelace", EntityKind::User, true);
    assert!(source.fetch_page(&missing, None, 10).await.unwrap().is_empty());
}

/// **Test: An entity's history file is read once per source**
///
/// **Setup:** Export with three messages for channel 20.
/// **Action:** Fetch the first page, delete `messages/20.json`, fetch the next page.
/// **Expected:** The second page still comes from the history loaded by the first request.
#[tokio::test]
async fn test_history_is_loaded_once() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path());
    let source = ExportSource::open(dir.path()).await.unwrap();

    let first = source.fetch_page(&news(), None, 1).await.unwrap();
    assert_eq!(first[0].id, 3);

    std::fs::remove_file(dir.path().join("messages").join("20.json")).unwrap();

    let rest = source.fetch_page(&news(), Some(3), 10).await.unwrap();
    let ids: Vec<i64> = rest.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn test_forbidden_channel_is_denied() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path());
    let source = ExportSource::open(dir.path()).await.unwrap();

    let gone = Entity::new(30, "ID: 30", EntityKind::Unknown, true);
    let result = source.fetch_page(&gone, None, 10).await;
    assert!(matches!(result, Err(SourceError::AccessDenied(_))));
}

/// **Test: Backfill from an export directory**
///
/// **Setup:** Export with three messages for channel 20, one of them a photo.
/// **Action:** Backfill with media download.
/// **Expected:** 3 rows, service text resolved via peers.json, photo copied under media/20.
#[tokio::test]
async fn test_backfill_from_export() {
    let export = TempDir::new().unwrap();
    write_export(export.path());
    let archive = TempDir::new().unwrap();
    let layout = ArchiveLayout::new(archive.path());

    let source = Arc::new(ExportSource::open(export.path()).await.unwrap());
    let sync = SyncController::new(source, layout.clone(), StoreOptions::default());
    let options = SyncOptions {
        download_media: true,
        ..SyncOptions::default()
    };

    let report = sync.backfill(&news(), &options).await.unwrap();
    assert_eq!(report.outcome, PassOutcome::Completed);
    assert_eq!(report.committed, 3);

    let store = ArchiveStore::open(&layout, 20, "News", &StoreOptions::default())
        .await
        .unwrap();
    let service = store.message(20, 3).await.unwrap().unwrap();
    assert_eq!(service.text.as_deref(), Some("Bob joined the group"));
    assert!(service.is_service_message);

    let photo = store.message(20, 2).await.unwrap().unwrap();
    let file = photo.media_file.unwrap();
    assert!(Path::new(&file).starts_with(layout.media_dir(20)));
    assert!(Path::new(&file).exists());
    assert!(photo.media_hash.is_some());

    let plain = store.message(20, 1).await.unwrap().unwrap();
    assert_eq!(plain.sender_name.as_deref(), Some("News"));
    store.close().await;

    assert!(archive.path().join("20_News.html").exists());
}
