//! Record store: content entities with attached key/value fields and tags
//!
//! The sync layer only talks to the `ContentStore` trait. `SqliteContentStore`
//! is the concrete host store used by the server binary and the tests.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tsync_common::{Error, Result};

mod slug;
mod sqlite;
mod terms;

pub use slug::slugify;
pub use sqlite::SqliteContentStore;

pub type EntityId = i64;

/// Publication status of a content entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Publish,
    Draft,
    Pending,
    Private,
    Trash,
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityStatus::Publish => "publish",
            EntityStatus::Draft => "draft",
            EntityStatus::Pending => "pending",
            EntityStatus::Private => "private",
            EntityStatus::Trash => "trash",
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "publish" => Ok(EntityStatus::Publish),
            "draft" => Ok(EntityStatus::Draft),
            "pending" => Ok(EntityStatus::Pending),
            "private" => Ok(EntityStatus::Private),
            "trash" => Ok(EntityStatus::Trash),
            other => Err(Error::Internal(format!("Unknown entity status '{}'", other))),
        }
    }
}

/// Identity of a stored entity: row id plus its fixed slug
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityKey {
    pub id: EntityId,
    pub slug: String,
}

/// Tag assignment within one taxonomy
///
/// `name: None` removes whatever tag the entity carries in that taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermAssignment {
    pub taxonomy: String,
    pub name: Option<String>,
}

/// Everything written to one entity in a single store transaction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityWrite {
    /// New title; required when creating, `None` keeps the title on update
    pub title: Option<String>,
    /// Attached fields to set, keyed by full (prefixed) key
    pub meta: BTreeMap<String, String>,
    pub terms: Vec<TermAssignment>,
}

/// Entity with all attached fields and tags loaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntity {
    pub id: EntityId,
    pub title: String,
    pub slug: String,
    pub status: EntityStatus,
    pub created_at: String,
    pub updated_at: String,
    pub meta: BTreeMap<String, String>,
    /// Tag names per taxonomy, sorted by name
    pub terms: BTreeMap<String, Vec<String>>,
}

impl StoredEntity {
    /// First tag name in a taxonomy
    pub fn first_term(&self, taxonomy: &str) -> Option<&str> {
        self.terms
            .get(taxonomy)
            .and_then(|names| names.first())
            .map(String::as_str)
    }

    pub fn meta_value(&self, key: &str) -> Option<&str> {
        self.meta.get(key).map(String::as_str)
    }
}

/// Host content-storage primitives
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Entities whose attached field `key` equals `value` exactly
    ///
    /// Trashed entities are excluded. Newest first (creation time, then id).
    async fn find_by_meta(&self, key: &str, value: &str) -> Result<Vec<EntityKey>>;

    /// Create a published entity and apply the write in one transaction
    ///
    /// Trashed entities still holding the external identifier carried by the
    /// write are purged first.
    async fn create_entity(&self, write: &EntityWrite) -> Result<EntityKey>;

    /// Apply a write to a live entity in one transaction
    ///
    /// Returns `None` when the entity no longer exists (or is trashed).
    async fn update_entity(&self, id: EntityId, write: &EntityWrite) -> Result<Option<EntityKey>>;

    async fn load_entity(&self, id: EntityId) -> Result<Option<StoredEntity>>;

    /// Permanently remove an entity with its attached fields and tag links
    ///
    /// Returns `false` when nothing was deleted.
    async fn delete_entity(&self, id: EntityId) -> Result<bool>;

    /// All entities with the given status that carry attached field `key`,
    /// ordered by title (case-insensitive)
    async fn list_with_meta(&self, key: &str, status: EntityStatus) -> Result<Vec<StoredEntity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            EntityStatus::Publish,
            EntityStatus::Draft,
            EntityStatus::Pending,
            EntityStatus::Private,
            EntityStatus::Trash,
        ] {
            assert_eq!(status.as_str().parse::<EntityStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EntityStatus>().is_err());
    }

    #[test]
    fn test_first_term() {
        let mut terms = BTreeMap::new();
        terms.insert("maqam".to_string(), vec!["Bayati".to_string(), "Rast".to_string()]);
        let entity = StoredEntity {
            id: 1,
            title: "t".into(),
            slug: "t".into(),
            status: EntityStatus::Publish,
            created_at: String::new(),
            updated_at: String::new(),
            meta: BTreeMap::new(),
            terms,
        };

        assert_eq!(entity.first_term("maqam"), Some("Bayati"));
        assert_eq!(entity.first_term("genre"), None);
    }
}
