//! Archive store: one SQLite file per entity holding messages, buttons, replies and reactions.
//!
//! Opening a store creates missing tables and migrates older schemas (see [`crate::schema`]).
//! The handle owns its connection; [`ArchiveStore::close`] releases it explicitly and dropping
//! the handle releases it on every other path.

use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::Result;
use crate::layout::ArchiveLayout;
use crate::models::{ButtonRecord, MessageRecord, NormalizedMessage, ReactionRecord, ReplyRecord};
use crate::schema::{self, MigrationReport};
use crate::sqlite_pool::{connect, retry_on_busy, StoreOptions};

const MESSAGE_COLUMNS: &str = r#"
    id, entity_id, COALESCE(date, '') AS date, text, media_type, media_file, media_hash, forwarded, from_id,
    COALESCE(views, 0) AS views, sender_name, reply_to_msg_id, reactions, web_preview,
    COALESCE(extraction_time, '') AS extraction_time,
    COALESCE(is_service_message, 0) AS is_service_message,
    COALESCE(is_voice_message, 0) AS is_voice_message,
    COALESCE(is_pinned, 0) AS is_pinned,
    user_id
"#;

/// Media already recorded for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMedia {
    pub path: Option<String>,
    pub hash: Option<String>,
}

pub struct ArchiveStore {
    pool: SqlitePool,
    path: PathBuf,
    migration: MigrationReport,
}

impl ArchiveStore {
    /// Opens (or creates) the store of one entity under `layout`.
    pub async fn open(
        layout: &ArchiveLayout,
        entity_id: i64,
        display_name: &str,
        options: &StoreOptions,
    ) -> Result<Self> {
        layout.ensure_root()?;
        Self::open_at(&layout.store_path(entity_id, display_name), options).await
    }

    /// Opens (or creates) the store file at `path`, retrying while it is busy.
    pub async fn open_at(path: &Path, options: &StoreOptions) -> Result<Self> {
        let (pool, migration) = retry_on_busy(options, "open store", || async move {
            let pool = connect(path, options).await?;
            match schema::prepare(&pool).await {
                Ok(migration) => Ok((pool, migration)),
                Err(e) => {
                    pool.close().await;
                    Err(e)
                }
            }
        })
        .await?;

        info!(path = %path.display(), "Store ready");
        Ok(Self {
            pool,
            path: path.to_path_buf(),
            migration,
        })
    }

    /// Schema changes applied while opening.
    pub fn migration(&self) -> &MigrationReport {
        &self.migration
    }

    /// Returns the underlying pool for running queries.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Releases the connection.
    pub async fn close(self) {
        self.pool.close().await;
        debug!(path = %self.path.display(), "Store closed");
    }

    /// Commits one message and its auxiliary rows in a single transaction.
    ///
    /// Message, button and reaction rows are write-once; the reply row is upserted, keeping the
    /// stored quote when the new one is missing. Returns true when the message row is new.
    pub async fn commit(&self, normalized: &NormalizedMessage) -> Result<bool> {
        let m = &normalized.message;
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO messages
            (id, entity_id, date, text, media_type, media_file, media_hash, forwarded, from_id, views,
             sender_name, reply_to_msg_id, reactions, web_preview, extraction_time, is_service_message,
             is_voice_message, is_pinned, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(m.id)
        .bind(m.entity_id)
        .bind(&m.date)
        .bind(&m.text)
        .bind(&m.media_type)
        .bind(&m.media_file)
        .bind(&m.media_hash)
        .bind(&m.forwarded)
        .bind(&m.from_id)
        .bind(m.views)
        .bind(&m.sender_name)
        .bind(m.reply_to_msg_id)
        .bind(&m.reactions)
        .bind(&m.web_preview)
        .bind(&m.extraction_time)
        .bind(m.is_service_message)
        .bind(m.is_voice_message)
        .bind(m.is_pinned)
        .bind(&m.user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if let Some(reply) = &normalized.reply {
            sqlx::query(
                r#"
                INSERT INTO replies (message_id, entity_id, reply_to_msg_id, quote_text)
                VALUES (?, ?, ?, ?)
                ON CONFLICT(message_id, entity_id) DO UPDATE SET
                    reply_to_msg_id = excluded.reply_to_msg_id,
                    quote_text = COALESCE(excluded.quote_text, replies.quote_text)
                "#,
            )
            .bind(reply.message_id)
            .bind(reply.entity_id)
            .bind(reply.reply_to_msg_id)
            .bind(&reply.quote_text)
            .execute(&mut *tx)
            .await?;
        }

        for button in &normalized.buttons {
            sqlx::query(
                r#"INSERT OR IGNORE INTO buttons (message_id, entity_id, row, "column", text, data, url)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(button.message_id)
            .bind(button.entity_id)
            .bind(button.row)
            .bind(button.column)
            .bind(&button.text)
            .bind(&button.data)
            .bind(&button.url)
            .execute(&mut *tx)
            .await?;
        }

        for reaction in &normalized.reactions {
            sqlx::query(
                "INSERT OR IGNORE INTO reactions (message_id, entity_id, emoji, count) VALUES (?, ?, ?, ?)",
            )
            .bind(reaction.message_id)
            .bind(reaction.entity_id)
            .bind(&reaction.emoji)
            .bind(reaction.count)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(
            message_id = m.id,
            entity_id = m.entity_id,
            inserted,
            buttons = normalized.buttons.len(),
            reactions = normalized.reactions.len(),
            "Committed message"
        );
        Ok(inserted)
    }

    /// Highest stored message id of the entity: the resume cursor of an update pass.
    pub async fn max_message_id(&self, entity_id: i64) -> Result<Option<i64>> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM messages WHERE entity_id = ?")
            .bind(entity_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    pub async fn message_count(&self, entity_id: Option<i64>) -> Result<i64> {
        let row: (i64,) = match entity_id {
            Some(id) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE entity_id = ?")
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM messages")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(row.0)
    }

    /// Media recorded for `(entity_id, message_id, media_type)`, if the message is stored.
    pub async fn find_media(
        &self,
        entity_id: i64,
        message_id: i64,
        media_type: &str,
    ) -> Result<Option<StoredMedia>> {
        let row: Option<(Option<String>, Option<String>)> = sqlx::query_as(
            "SELECT media_file, media_hash FROM messages WHERE id = ? AND entity_id = ? AND media_type = ?",
        )
        .bind(message_id)
        .bind(entity_id)
        .bind(media_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(path, hash)| StoredMedia { path, hash }))
    }

    pub async fn message(&self, entity_id: i64, message_id: i64) -> Result<Option<MessageRecord>> {
        let sql = format!(
            "SELECT {} FROM messages WHERE entity_id = ? AND id = ?",
            MESSAGE_COLUMNS
        );
        let record = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(entity_id)
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Messages of one entity (or all entities), newest first.
    pub async fn messages(&self, entity_id: Option<i64>) -> Result<Vec<MessageRecord>> {
        let filter = if entity_id.is_some() { "WHERE entity_id = ?" } else { "" };
        let sql = format!(
            "SELECT {} FROM messages {} ORDER BY date DESC, id DESC",
            MESSAGE_COLUMNS, filter
        );
        let mut query = sqlx::query_as::<_, MessageRecord>(&sql);
        if let Some(id) = entity_id {
            query = query.bind(id);
        }
        let messages = query.fetch_all(&self.pool).await?;
        debug!(count = messages.len(), entity_id = ?entity_id, "Loaded messages");
        Ok(messages)
    }

    pub async fn buttons(&self, entity_id: Option<i64>) -> Result<Vec<ButtonRecord>> {
        let filter = if entity_id.is_some() { "WHERE entity_id = ?" } else { "" };
        let sql = format!(
            r#"SELECT message_id, entity_id, row, "column", COALESCE(text, '') AS text, data, url
               FROM buttons {} ORDER BY message_id, entity_id, row, "column""#,
            filter
        );
        let mut query = sqlx::query_as::<_, ButtonRecord>(&sql);
        if let Some(id) = entity_id {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn reactions(&self, entity_id: Option<i64>) -> Result<Vec<ReactionRecord>> {
        let filter = if entity_id.is_some() { "WHERE entity_id = ?" } else { "" };
        let sql = format!(
            "SELECT message_id, entity_id, emoji, count FROM reactions {} ORDER BY message_id, entity_id, rowid",
            filter
        );
        let mut query = sqlx::query_as::<_, ReactionRecord>(&sql);
        if let Some(id) = entity_id {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn replies(&self, entity_id: Option<i64>) -> Result<Vec<ReplyRecord>> {
        let filter = if entity_id.is_some() { "WHERE entity_id = ?" } else { "" };
        let sql = format!(
            "SELECT message_id, entity_id, reply_to_msg_id, quote_text FROM replies {} ORDER BY message_id",
            filter
        );
        let mut query = sqlx::query_as::<_, ReplyRecord>(&sql);
        if let Some(id) = entity_id {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}
