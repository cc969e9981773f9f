//! Media dedup: reuse a recorded download while its file exists, otherwise fetch and hash.

use std::path::Path;

use archive_core::{MessageSource, RawMessage};
use sha2::{Digest, Sha256};
use storage::{ArchiveLayout, ArchiveStore, StoredMedia};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// What to do with the media of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaDecision {
    /// A previous pass downloaded it and the file is still on disk.
    Reuse { path: String, hash: Option<String> },
    Fetch,
}

/// Hex SHA-256 of the file, read in 64 KiB chunks.
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

async fn decide(
    store: &ArchiveStore,
    entity_id: i64,
    message_id: i64,
    media_type: &str,
) -> storage::Result<MediaDecision> {
    let recorded = store.find_media(entity_id, message_id, media_type).await?;
    match recorded {
        Some(StoredMedia {
            path: Some(path),
            hash,
        }) if tokio::fs::try_exists(&path).await.unwrap_or(false) => {
            Ok(MediaDecision::Reuse { path, hash })
        }
        _ => Ok(MediaDecision::Fetch),
    }
}

/// False iff a recorded download for `(entity_id, message_id, media_type)` still exists on disk.
pub async fn should_fetch(
    store: &ArchiveStore,
    entity_id: i64,
    message_id: i64,
    media_type: &str,
) -> storage::Result<bool> {
    Ok(decide(store, entity_id, message_id, media_type).await? == MediaDecision::Fetch)
}

/// Downloads media into `layout.media_dir(entity_id)` unless a usable copy is recorded.
///
/// A recorded path whose file is gone triggers a fresh download, but the message row is
/// write-once: committing the re-normalized message does not replace the stored path or hash.
/// If the new download lands elsewhere, every later pass sees the old missing path and
/// downloads again.
pub struct MediaDedup<'a> {
    source: &'a dyn MessageSource,
    layout: &'a ArchiveLayout,
}

impl<'a> MediaDedup<'a> {
    pub fn new(source: &'a dyn MessageSource, layout: &'a ArchiveLayout) -> Self {
        Self { source, layout }
    }

    pub async fn resolve(
        &self,
        store: &ArchiveStore,
        entity_id: i64,
        message_id: i64,
        media_type: &str,
    ) -> storage::Result<MediaDecision> {
        decide(store, entity_id, message_id, media_type).await
    }

    /// Path and hash for the message's media. Failures are logged and leave both fields empty.
    pub async fn acquire(
        &self,
        store: &ArchiveStore,
        message: &RawMessage,
        entity_id: i64,
        media_type: &str,
    ) -> StoredMedia {
        match self.resolve(store, entity_id, message.id, media_type).await {
            Ok(MediaDecision::Reuse { path, hash }) => {
                debug!(message_id = message.id, path = %path, "Reusing downloaded media");
                return StoredMedia {
                    path: Some(path),
                    hash,
                };
            }
            Ok(MediaDecision::Fetch) => {}
            Err(e) => {
                warn!(message_id = message.id, error = %e, "Media lookup failed, downloading again");
            }
        }
        self.fetch(message, entity_id).await
    }

    async fn fetch(&self, message: &RawMessage, entity_id: i64) -> StoredMedia {
        let empty = StoredMedia {
            path: None,
            hash: None,
        };
        let dir = self.layout.media_dir(entity_id);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(message_id = message.id, error = %e, dir = %dir.display(), "Failed to create media directory");
            return empty;
        }

        let path = match self.source.download_media(message, &dir).await {
            Ok(Some(path)) => path,
            Ok(None) => return empty,
            Err(e) => {
                warn!(message_id = message.id, error = %e, "Error downloading media");
                return empty;
            }
        };

        let hash = match hash_file(&path).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(message_id = message.id, error = %e, path = %path.display(), "Failed to hash media");
                None
            }
        };
        debug!(message_id = message.id, path = %path.display(), "Downloaded media");
        StoredMedia {
            path: Some(path.to_string_lossy().into_owned()),
            hash,
        }
    }
}
