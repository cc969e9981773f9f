//! Table creation and additive migration of archive stores.
//!
//! Migrations only ever add tables or columns; nothing is dropped or renamed.

use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::info;

use crate::user_id::extract_user_id;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER,
    entity_id INTEGER,
    date TEXT,
    text TEXT,
    media_type TEXT,
    media_file TEXT,
    media_hash TEXT,
    forwarded TEXT,
    from_id TEXT,
    views INTEGER,
    sender_name TEXT,
    reply_to_msg_id INTEGER,
    reactions TEXT,
    web_preview TEXT,
    extraction_time TEXT,
    is_service_message BOOLEAN,
    is_voice_message BOOLEAN,
    is_pinned BOOLEAN,
    user_id TEXT,
    PRIMARY KEY (id, entity_id)
)
"#;

const CREATE_BUTTONS: &str = r#"
CREATE TABLE IF NOT EXISTS buttons (
    message_id INTEGER,
    entity_id INTEGER,
    row INTEGER,
    "column" INTEGER,
    text TEXT,
    data TEXT,
    url TEXT,
    UNIQUE(message_id, entity_id, row, "column")
)
"#;

const CREATE_REPLIES: &str = r#"
CREATE TABLE IF NOT EXISTS replies (
    message_id INTEGER,
    entity_id INTEGER,
    reply_to_msg_id INTEGER,
    quote_text TEXT,
    UNIQUE(message_id, entity_id)
)
"#;

const CREATE_REACTIONS: &str = r#"
CREATE TABLE IF NOT EXISTS reactions (
    message_id INTEGER,
    entity_id INTEGER,
    emoji TEXT,
    count INTEGER,
    UNIQUE(message_id, entity_id, emoji)
)
"#;

/// Columns added to `messages` after the first schema version, with their DDL.
const MESSAGE_COLUMN_UPGRADES: [(&str, &str); 4] = [
    ("is_service_message", "BOOLEAN DEFAULT 0"),
    ("is_voice_message", "BOOLEAN DEFAULT 0"),
    ("is_pinned", "BOOLEAN DEFAULT 0"),
    ("user_id", "TEXT"),
];

/// What opening a store changed in its schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Columns added to `messages`, in the order they were added.
    pub added_message_columns: Vec<String>,
    /// Rows whose `user_id` was filled in from `from_id`.
    pub backfilled_user_ids: u64,
    /// True when `replies.quote_text` had to be added.
    pub added_quote_text: bool,
    /// True when the `replies` table did not exist before opening.
    pub created_replies_table: bool,
}

impl MigrationReport {
    pub fn is_empty(&self) -> bool {
        self.added_message_columns.is_empty()
            && !self.added_quote_text
            && !self.created_replies_table
    }
}

async fn table_exists(pool: &SqlitePool, table: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(table)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

/// Column names of `table`; empty when the table does not exist.
pub async fn table_columns(pool: &SqlitePool, table: &str) -> Result<HashSet<String>, sqlx::Error> {
    let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
        .fetch_all(pool)
        .await?;
    let mut columns = HashSet::new();
    for row in rows {
        let name: String = row.try_get("name")?;
        columns.insert(name);
    }
    Ok(columns)
}

/// Creates missing tables and applies additive migrations to pre-existing ones.
pub async fn prepare(pool: &SqlitePool) -> Result<MigrationReport, sqlx::Error> {
    let mut report = MigrationReport {
        created_replies_table: table_exists(pool, "messages").await?
            && !table_exists(pool, "replies").await?,
        ..MigrationReport::default()
    };

    for ddl in [CREATE_MESSAGES, CREATE_BUTTONS, CREATE_REPLIES, CREATE_REACTIONS] {
        sqlx::query(ddl).execute(pool).await?;
    }

    migrate_messages(pool, &mut report).await?;
    migrate_replies(pool, &mut report).await?;

    if report.is_empty() {
        info!("Store schema is current");
    } else {
        info!(
            added_columns = ?report.added_message_columns,
            backfilled_user_ids = report.backfilled_user_ids,
            added_quote_text = report.added_quote_text,
            created_replies_table = report.created_replies_table,
            "Store schema migrated"
        );
    }

    Ok(report)
}

async fn migrate_messages(pool: &SqlitePool, report: &mut MigrationReport) -> Result<(), sqlx::Error> {
    let existing = table_columns(pool, "messages").await?;

    for (column, ddl) in MESSAGE_COLUMN_UPGRADES {
        if existing.contains(column) {
            continue;
        }
        info!(column, "Adding missing column to messages");
        sqlx::query(&format!("ALTER TABLE messages ADD COLUMN {} {}", column, ddl))
            .execute(pool)
            .await?;
        report.added_message_columns.push(column.to_string());

        if column == "user_id" {
            report.backfilled_user_ids = backfill_user_ids(pool).await?;
        }
    }

    Ok(())
}

/// Fills `user_id` for every row from its stored `from_id`, in one transaction.
async fn backfill_user_ids(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let rows: Vec<(i64, i64, Option<String>)> =
        sqlx::query_as("SELECT id, entity_id, from_id FROM messages")
            .fetch_all(&mut *tx)
            .await?;

    let mut updated = 0u64;
    for (id, entity_id, from_id) in rows {
        let Some(user_id) = from_id.as_deref().and_then(extract_user_id) else {
            continue;
        };
        sqlx::query("UPDATE messages SET user_id = ? WHERE id = ? AND entity_id = ?")
            .bind(user_id)
            .bind(id)
            .bind(entity_id)
            .execute(&mut *tx)
            .await?;
        updated += 1;
    }

    tx.commit().await?;
    info!(updated, "Backfilled user_id from stored sender references");
    Ok(updated)
}

async fn migrate_replies(pool: &SqlitePool, report: &mut MigrationReport) -> Result<(), sqlx::Error> {
    let columns = table_columns(pool, "replies").await?;
    if !columns.contains("quote_text") {
        info!("Adding quote_text column to replies");
        sqlx::query("ALTER TABLE replies ADD COLUMN quote_text TEXT")
            .execute(pool)
            .await?;
        report.added_quote_text = true;
    }
    Ok(())
}
