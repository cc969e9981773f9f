use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Row of the `buttons` table: a native keyboard button or a link harvested from message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonRecord {
    pub message_id: i64,
    pub entity_id: i64,
    pub row: i64,
    pub column: i64,
    pub text: String,
    pub data: Option<String>,
    pub url: Option<String>,
}

// Written out because the derive binds its own row argument as `row`, which the field shadows.
impl<'r> FromRow<'r, SqliteRow> for ButtonRecord {
    fn from_row(r: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: r.try_get("message_id")?,
            entity_id: r.try_get("entity_id")?,
            row: r.try_get("row")?,
            column: r.try_get("column")?,
            text: r.try_get("text")?,
            data: r.try_get("data")?,
            url: r.try_get("url")?,
        })
    }
}
