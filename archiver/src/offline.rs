//! Offline message source backed by an export directory.
//!
//! Layout:
//!
//! ```text
//! <dir>/dialogs.json              dialog list
//! <dir>/contacts.json             contacts (optional)
//! <dir>/peers.json                extra peers for name lookups (optional)
//! <dir>/messages/<entity_id>.json raw messages of one entity
//! <dir>/files/<file_name>         media payloads
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use archive_core::{
    Contact, Dialog, Entity, MessageSource, PeerRef, RawMessage, ResolvedPeer, SourceError,
    SourceResult,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Entry of `peers.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerEntry {
    pub peer: PeerRef,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub title: Option<String>,
}

pub struct ExportSource {
    dir: PathBuf,
    dialogs: Vec<Dialog>,
    contacts: Vec<Contact>,
    peers: HashMap<PeerRef, ResolvedPeer>,
    forbidden: HashSet<i64>,
    /// Per-entity history, read and sorted newest-first on first request.
    histories: Mutex<HashMap<i64, Arc<Vec<RawMessage>>>>,
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> SourceResult<Option<T>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(SourceError::Transport(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| SourceError::Transport(format!("invalid JSON in {}: {}", path.display(), e)))
}

fn peer_of_dialog(dialog: &Dialog) -> Option<(PeerRef, ResolvedPeer)> {
    match dialog {
        Dialog::User {
            id,
            first_name,
            last_name,
        } => Some((
            PeerRef::User(*id),
            ResolvedPeer {
                id: *id,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                title: None,
            },
        )),
        Dialog::Channel { id, title, .. } => Some((
            PeerRef::Channel(*id),
            ResolvedPeer {
                id: *id,
                title: Some(title.clone()),
                ..ResolvedPeer::default()
            },
        )),
        Dialog::Chat { id, title } => Some((
            PeerRef::Chat(*id),
            ResolvedPeer {
                id: *id,
                title: Some(title.clone()),
                ..ResolvedPeer::default()
            },
        )),
        Dialog::ChannelForbidden { .. } | Dialog::Unknown { .. } => None,
    }
}

impl ExportSource {
    /// Reads the dialog, contact and peer files of an export directory.
    pub async fn open(dir: impl Into<PathBuf>) -> SourceResult<Self> {
        let dir = dir.into();
        let dialogs: Vec<Dialog> = read_json(&dir.join("dialogs.json"))
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("{}/dialogs.json", dir.display())))?;
        let contacts: Vec<Contact> = read_json(&dir.join("contacts.json"))
            .await?
            .unwrap_or_default();
        let extra: Vec<PeerEntry> = read_json(&dir.join("peers.json"))
            .await?
            .unwrap_or_default();

        let mut peers: HashMap<PeerRef, ResolvedPeer> =
            dialogs.iter().filter_map(peer_of_dialog).collect();
        for entry in extra {
            peers.insert(
                entry.peer,
                ResolvedPeer {
                    id: entry.peer.id(),
                    first_name: entry.first_name,
                    last_name: entry.last_name,
                    title: entry.title,
                },
            );
        }
        let forbidden = dialogs
            .iter()
            .filter(|d| matches!(d, Dialog::ChannelForbidden { .. }))
            .map(Dialog::id)
            .collect();

        info!(
            dir = %dir.display(),
            dialogs = dialogs.len(),
            contacts = contacts.len(),
            peers = peers.len(),
            "Opened export directory"
        );
        Ok(Self {
            dir,
            dialogs,
            contacts,
            peers,
            forbidden,
            histories: Mutex::new(HashMap::new()),
        })
    }

    fn messages_path(&self, entity_id: i64) -> PathBuf {
        self.dir.join("messages").join(format!("{}.json", entity_id))
    }

    async fn history(&self, entity_id: i64) -> SourceResult<Arc<Vec<RawMessage>>> {
        let mut histories = self.histories.lock().await;
        if let Some(history) = histories.get(&entity_id) {
            return Ok(Arc::clone(history));
        }
        let mut messages: Vec<RawMessage> = read_json(&self.messages_path(entity_id))
            .await?
            .unwrap_or_default();
        messages.sort_by(|a, b| b.id.cmp(&a.id));
        debug!(entity_id, count = messages.len(), "Loaded export history");
        let history = Arc::new(messages);
        histories.insert(entity_id, Arc::clone(&history));
        Ok(history)
    }
}

#[async_trait]
impl MessageSource for ExportSource {
    async fn dialogs(&self) -> SourceResult<Vec<Dialog>> {
        Ok(self.dialogs.clone())
    }

    async fn contacts(&self) -> SourceResult<Vec<Contact>> {
        Ok(self.contacts.clone())
    }

    async fn fetch_page(
        &self,
        entity: &Entity,
        offset_id: Option<i64>,
        limit: usize,
    ) -> SourceResult<Vec<RawMessage>> {
        if self.forbidden.contains(&entity.id) {
            return Err(SourceError::AccessDenied(format!(
                "channel {} is private or banned",
                entity.id
            )));
        }
        let history = self.history(entity.id).await?;
        let start = match offset_id {
            Some(offset) => history.partition_point(|m| m.id >= offset),
            None => 0,
        };
        let page: Vec<RawMessage> = history.iter().skip(start).take(limit).cloned().collect();
        debug!(entity_id = entity.id, offset_id = ?offset_id, count = page.len(), "Read page from export");
        Ok(page)
    }

    async fn resolve_user(&self, user_id: i64) -> SourceResult<ResolvedPeer> {
        self.resolve_peer(&PeerRef::User(user_id)).await
    }

    async fn resolve_peer(&self, peer: &PeerRef) -> SourceResult<ResolvedPeer> {
        self.peers
            .get(peer)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(peer.to_string()))
    }

    async fn download_media(&self, message: &RawMessage, dir: &Path) -> SourceResult<Option<PathBuf>> {
        let Some(file_name) = message.media.as_ref().and_then(|m| m.file_name()) else {
            return Ok(None);
        };
        let source = self.dir.join("files").join(file_name);
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            return Err(SourceError::NotFound(source.display().to_string()));
        }
        let target = dir.join(file_name);
        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| SourceError::Transport(format!("failed to copy {}: {}", source.display(), e)))?;
        Ok(Some(target))
    }
}
