//! CSV exports: the entity listing and the contacts list.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet tools pick the encoding up.

use std::fs;
use std::path::Path;

use archive_core::Contact;
use tracing::info;

use crate::catalog::EntityCatalog;
use crate::error::ExportError;

const BOM: &str = "\u{feff}";

/// One line of the contacts export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub index: usize,
    pub name: String,
    pub phone: String,
    pub username: String,
    pub id: i64,
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(fields: &[&str]) -> String {
    let mut line = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    line.push_str("\r\n");
    line
}

fn write_with_parent(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Rows for the contacts export, with placeholders for missing fields and deleted accounts.
pub fn contact_rows(contacts: &[Contact]) -> Vec<ContactRow> {
    contacts
        .iter()
        .enumerate()
        .map(|(index, contact)| match &contact.user {
            Some(user) => ContactRow {
                index,
                name: user.full_name().unwrap_or_else(|| "No name".to_string()),
                phone: user
                    .phone
                    .clone()
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| "Private".to_string()),
                username: user
                    .username
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .map(|u| format!("@{}", u))
                    .unwrap_or_else(|| "No username".to_string()),
                id: contact.user_id,
            },
            None => ContactRow {
                index,
                name: "Deleted user".to_string(),
                phone: "Not available".to_string(),
                username: "Not available".to_string(),
                id: contact.user_id,
            },
        })
        .collect()
}

/// Writes `Index,Name,Phone,Username,ID`. Returns the rows written.
pub fn write_contacts(contacts: &[Contact], path: &Path) -> Result<Vec<ContactRow>, ExportError> {
    let rows = contact_rows(contacts);
    let mut out = String::from(BOM);
    out.push_str(&csv_line(&["Index", "Name", "Phone", "Username", "ID"]));
    for row in &rows {
        out.push_str(&csv_line(&[
            &row.index.to_string(),
            &row.name,
            &row.phone,
            &row.username,
            &row.id.to_string(),
        ]));
    }
    write_with_parent(path, &out)?;
    info!(count = rows.len(), path = %path.display(), "Contacts exported");
    Ok(rows)
}

/// Writes `Index,Type,Name,ID` in flat-index order. Returns the number of entities written.
pub fn write_entity_listing(catalog: &EntityCatalog, path: &Path) -> Result<usize, ExportError> {
    let mut out = String::from(BOM);
    out.push_str(&csv_line(&["Index", "Type", "Name", "ID"]));
    for (index, entity) in catalog.entities().iter().enumerate() {
        out.push_str(&csv_line(&[
            &index.to_string(),
            entity.kind.label(),
            &entity.display_name,
            &entity.id.to_string(),
        ]));
    }
    write_with_parent(path, &out)?;
    info!(count = catalog.len(), path = %path.display(), "Entity listing exported");
    Ok(catalog.len())
}
