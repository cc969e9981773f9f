//! Mock implementation of [`archive_core::MessageSource`] for integration tests.
//!
//! Serves scripted message histories newest-first, resolves names from fixed tables, writes
//! media payloads from memory, and records every page request so tests can assert on paging.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use archive_core::{
    Contact, Dialog, Entity, EntityKind, MessageSource, PeerRef, RawMessage, ResolvedPeer,
    SourceError, SourceResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One recorded `fetch_page(entity, offset_id, limit)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub entity_id: i64,
    pub offset_id: Option<i64>,
    pub limit: usize,
}

#[derive(Default)]
pub struct MockSource {
    dialogs: Vec<Dialog>,
    contacts: Vec<Contact>,
    messages: Mutex<HashMap<i64, Vec<RawMessage>>>,
    peers: HashMap<PeerRef, ResolvedPeer>,
    files: HashMap<String, Vec<u8>>,
    /// Error returned by the n-th `fetch_page` call (0-based), instead of a page.
    scripted: Mutex<HashMap<usize, SourceError>>,
    requests: Mutex<Vec<PageRequest>>,
    fetch_calls: AtomicUsize,
    download_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialogs(mut self, dialogs: Vec<Dialog>) -> Self {
        self.dialogs = dialogs;
        self
    }

    pub fn with_contacts(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }

    pub fn with_messages(self, entity_id: i64, messages: Vec<RawMessage>) -> Self {
        self.add_messages(entity_id, messages);
        self
    }

    pub fn with_user(mut self, id: i64, first_name: &str, last_name: Option<&str>) -> Self {
        self.peers.insert(
            PeerRef::User(id),
            ResolvedPeer {
                id,
                first_name: Some(first_name.to_string()),
                last_name: last_name.map(str::to_string),
                title: None,
            },
        );
        self
    }

    /// Registers a channel or chat title.
    pub fn with_titled_peer(mut self, peer: PeerRef, title: &str) -> Self {
        self.peers.insert(
            peer,
            ResolvedPeer {
                id: peer.id(),
                title: Some(title.to_string()),
                ..ResolvedPeer::default()
            },
        );
        self
    }

    pub fn with_file(mut self, file_name: &str, bytes: &[u8]) -> Self {
        self.files.insert(file_name.to_string(), bytes.to_vec());
        self
    }

    /// Makes the `call`-th `fetch_page` (0-based) fail with `error`.
    pub fn fail_on_call(self, call: usize, error: SourceError) -> Self {
        self.scripted.lock().unwrap().insert(call, error);
        self
    }

    /// Adds messages to an entity's history (e.g. new messages arriving between passes).
    pub fn add_messages(&self, entity_id: i64, messages: Vec<RawMessage>) {
        let mut all = self.messages.lock().unwrap();
        let history = all.entry(entity_id).or_default();
        history.extend(messages);
        history.sort_by(|a, b| b.id.cmp(&a.id));
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn download_calls(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for MockSource {
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
        let call = self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(PageRequest {
            entity_id: entity.id,
            offset_id,
            limit,
        });
        if let Some(error) = self.scripted.lock().unwrap().remove(&call) {
            return Err(error);
        }
        let all = self.messages.lock().unwrap();
        let page = all
            .get(&entity.id)
            .map(|history| {
                history
                    .iter()
                    .filter(|m| offset_id.map_or(true, |offset| m.id < offset))
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
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
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let Some(file_name) = message.media.as_ref().and_then(|m| m.file_name()) else {
            return Ok(None);
        };
        let bytes = self
            .files
            .get(file_name)
            .ok_or_else(|| SourceError::Transport(format!("download of {} failed", file_name)))?;
        let path = dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|e| SourceError::Transport(e.to_string()))?;
        Ok(Some(path))
    }
}

pub fn at(date: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(date)
        .unwrap()
        .with_timezone(&Utc)
}

/// Text message `id` posted at `date` (RFC 3339).
pub fn text_message(id: i64, date: &str, text: &str) -> RawMessage {
    RawMessage::text(id, at(date), text)
}

/// `count` text messages with ids `1..=count`, one minute apart on 2024-03-01.
pub fn history(count: i64) -> Vec<RawMessage> {
    (1..=count)
        .map(|id| {
            text_message(
                id,
                &format!("2024-03-01T10:{:02}:00+00:00", id % 60),
                &format!("message {}", id),
            )
        })
        .collect()
}

pub fn entity(id: i64, name: &str) -> Entity {
    Entity::new(id, name, EntityKind::Supergroup, true)
}
