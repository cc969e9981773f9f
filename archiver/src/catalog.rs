//! Entity catalog: classifies the dialog list into buckets with a flat, stable index.

use std::path::Path;

use archive_core::{join_name, Dialog, Entity, EntityKind, MessageSource, SourceResult};
use tracing::info;

use crate::error::ExportError;
use crate::export::write_entity_listing;

/// Classified entities, bucketed in [`EntityKind::ALL`] order.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<Entity>,
}

/// Maps one dialog to its catalog entity.
pub fn classify(dialog: &Dialog) -> Entity {
    match dialog {
        Dialog::User {
            id,
            first_name,
            last_name,
        } => {
            let name = join_name(first_name.as_deref(), last_name.as_deref())
                .unwrap_or_else(|| format!("ID: {}", id));
            Entity::new(*id, name, EntityKind::User, true)
        }
        Dialog::Channel {
            id,
            title,
            broadcast,
        } => {
            let kind = if *broadcast {
                EntityKind::Channel
            } else {
                EntityKind::Supergroup
            };
            Entity::new(*id, title.clone(), kind, true)
        }
        Dialog::Chat { id, title } => Entity::new(*id, title.clone(), EntityKind::Group, true),
        Dialog::ChannelForbidden { id, .. } | Dialog::Unknown { id } => {
            Entity::new(*id, format!("ID: {}", id), EntityKind::Unknown, false)
        }
    }
}

impl EntityCatalog {
    pub fn from_dialogs(dialogs: &[Dialog]) -> Self {
        let classified: Vec<Entity> = dialogs.iter().map(classify).collect();
        let mut entities = Vec::with_capacity(classified.len());
        for kind in EntityKind::ALL {
            entities.extend(classified.iter().filter(|e| e.kind == kind).cloned());
        }
        info!(
            total = entities.len(),
            unknown = entities.iter().filter(|e| e.kind == EntityKind::Unknown).count(),
            "Entity catalog built"
        );
        Self { entities }
    }

    /// Fetches the dialog list from the source and classifies it.
    pub async fn fetch(source: &dyn MessageSource) -> SourceResult<Self> {
        let dialogs = source.dialogs().await?;
        Ok(Self::from_dialogs(&dialogs))
    }

    /// All entities in flat-index order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity at a flat index.
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    /// Entities of one bucket with their flat indices.
    pub fn bucket(&self, kind: EntityKind) -> impl Iterator<Item = (usize, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Writes the `Index,Type,Name,ID` listing; returns the number of rows.
    pub fn write_listing(&self, path: &Path) -> Result<usize, ExportError> {
        write_entity_listing(self, path)
    }
}
