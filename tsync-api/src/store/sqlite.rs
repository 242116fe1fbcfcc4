//! SQLite-backed content store

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use tsync_common::db::EXTERNAL_ID_META_KEY;
use tsync_common::{Error, Result};

use super::slug::unique_slug;
use super::terms::{load_entity_terms, resolve_or_create, set_entity_term};
use super::{ContentStore, EntityId, EntityKey, EntityStatus, EntityWrite, StoredEntity};

const NOW: &str = "strftime('%Y-%m-%dT%H:%M:%fZ', 'now')";

/// Content store over the shared SQLite pool
#[derive(Clone)]
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

type EntityRow = (EntityId, String, String, String, String, String);

fn entity_from_row(row: EntityRow) -> Result<StoredEntity> {
    let (id, title, slug, status, created_at, updated_at) = row;
    Ok(StoredEntity {
        id,
        title,
        slug,
        status: status.parse()?,
        created_at,
        updated_at,
        meta: BTreeMap::new(),
        terms: BTreeMap::new(),
    })
}

/// Upsert attached fields
async fn write_meta(
    conn: &mut SqliteConnection,
    entity_id: EntityId,
    meta: &BTreeMap<String, String>,
) -> Result<()> {
    for (key, value) in meta {
        sqlx::query(
            r#"
            INSERT INTO entity_meta (entity_id, meta_key, meta_value)
            VALUES (?, ?, ?)
            ON CONFLICT(entity_id, meta_key) DO UPDATE SET
                meta_value = excluded.meta_value
            "#,
        )
        .bind(entity_id)
        .bind(key)
        .bind(value)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Apply tag assignments, creating vocabulary terms on first use
async fn apply_terms(
    conn: &mut SqliteConnection,
    entity_id: EntityId,
    write: &EntityWrite,
) -> Result<()> {
    for assignment in &write.terms {
        let term_id = match assignment.name.as_deref() {
            Some(name) => Some(resolve_or_create(&mut *conn, &assignment.taxonomy, name).await?),
            None => None,
        };
        set_entity_term(&mut *conn, entity_id, &assignment.taxonomy, term_id).await?;
    }
    Ok(())
}

/// Remove trashed entities that still hold an external identifier
///
/// With no identifier nothing matches, but the statement still takes the
/// write lock for the enclosing transaction.
async fn purge_trashed_holders(
    conn: &mut SqliteConnection,
    external_id: Option<&str>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM entities
        WHERE status = 'trash'
          AND id IN (
              SELECT entity_id FROM entity_meta
              WHERE meta_key = ? AND meta_value = ?
          )
        "#,
    )
    .bind(EXTERNAL_ID_META_KEY)
    .bind(external_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn find_by_meta(&self, key: &str, value: &str) -> Result<Vec<EntityKey>> {
        let rows: Vec<(EntityId, String)> = sqlx::query_as(
            r#"
            SELECT e.id, e.slug
            FROM entities e
            JOIN entity_meta m ON m.entity_id = e.id
            WHERE m.meta_key = ? AND m.meta_value = ? AND e.status != 'trash'
            ORDER BY e.created_at DESC, e.id DESC
            "#,
        )
        .bind(key)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, slug)| EntityKey { id, slug })
            .collect())
    }

    async fn create_entity(&self, write: &EntityWrite) -> Result<EntityKey> {
        let title = write
            .title
            .as_deref()
            .ok_or_else(|| Error::InvalidInput("title is required to create an entity".into()))?;

        let mut tx = self.pool.begin().await?;

        let external_id = write.meta.get(EXTERNAL_ID_META_KEY).map(String::as_str);
        let purged = purge_trashed_holders(&mut tx, external_id).await?;
        if purged > 0 {
            warn!(
                "Purged {} trashed entit{} holding external id {}",
                purged,
                if purged == 1 { "y" } else { "ies" },
                external_id.unwrap_or_default()
            );
        }

        let slug = unique_slug(&mut tx, title).await?;

        let result = sqlx::query("INSERT INTO entities (title, slug, status) VALUES (?, ?, 'publish')")
            .bind(title)
            .bind(&slug)
            .execute(&mut *tx)
            .await?;
        let id = result.last_insert_rowid();

        write_meta(&mut tx, id, &write.meta).await?;
        apply_terms(&mut tx, id, write).await?;

        tx.commit().await?;

        debug!("Created entity {} ({})", id, slug);
        Ok(EntityKey { id, slug })
    }

    async fn update_entity(&self, id: EntityId, write: &EntityWrite) -> Result<Option<EntityKey>> {
        let mut tx = self.pool.begin().await?;

        // First statement is a write so the transaction holds the write lock
        // from the start; a read-then-upgrade fails with SQLITE_BUSY under WAL.
        let slug: Option<String> = sqlx::query_scalar(&format!(
            r#"
            UPDATE entities
            SET title = COALESCE(?, title), updated_at = {}
            WHERE id = ? AND status != 'trash'
            RETURNING slug
            "#,
            NOW
        ))
        .bind(write.title.as_deref())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(slug) = slug else {
            return Ok(None);
        };

        write_meta(&mut tx, id, &write.meta).await?;
        apply_terms(&mut tx, id, write).await?;

        tx.commit().await?;

        debug!("Updated entity {} ({})", id, slug);
        Ok(Some(EntityKey { id, slug }))
    }

    async fn load_entity(&self, id: EntityId) -> Result<Option<StoredEntity>> {
        let mut conn = self.pool.acquire().await?;

        let row: Option<EntityRow> = sqlx::query_as(
            "SELECT id, title, slug, status, created_at, updated_at FROM entities WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut entity = entity_from_row(row)?;

        let meta: Vec<(String, String)> =
            sqlx::query_as("SELECT meta_key, meta_value FROM entity_meta WHERE entity_id = ?")
                .bind(id)
                .fetch_all(&mut *conn)
                .await?;
        entity.meta = meta.into_iter().collect();
        entity.terms = load_entity_terms(&mut conn, id).await?;

        Ok(Some(entity))
    }

    async fn delete_entity(&self, id: EntityId) -> Result<bool> {
        // entity_meta and entity_terms rows go with it (ON DELETE CASCADE)
        let result = sqlx::query("DELETE FROM entities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_with_meta(&self, key: &str, status: EntityStatus) -> Result<Vec<StoredEntity>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<EntityRow> = sqlx::query_as(
            r#"
            SELECT e.id, e.title, e.slug, e.status, e.created_at, e.updated_at
            FROM entities e
            WHERE e.status = ?
              AND EXISTS (
                  SELECT 1 FROM entity_meta m
                  WHERE m.entity_id = e.id AND m.meta_key = ?
              )
            ORDER BY e.title COLLATE NOCASE, e.id
            "#,
        )
        .bind(status.as_str())
        .bind(key)
        .fetch_all(&mut *conn)
        .await?;

        let mut entities = rows
            .into_iter()
            .map(entity_from_row)
            .collect::<Result<Vec<_>>>()?;

        let meta: Vec<(EntityId, String, String)> = sqlx::query_as(
            r#"
            SELECT m.entity_id, m.meta_key, m.meta_value
            FROM entity_meta m
            JOIN entities e ON e.id = m.entity_id
            WHERE e.status = ?
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&mut *conn)
        .await?;

        let tags: Vec<(EntityId, String, String)> = sqlx::query_as(
            r#"
            SELECT et.entity_id, et.taxonomy, t.name
            FROM entity_terms et
            JOIN terms t ON t.id = et.term_id
            JOIN entities e ON e.id = et.entity_id
            WHERE e.status = ?
            ORDER BY t.name
            "#,
        )
        .bind(status.as_str())
        .fetch_all(&mut *conn)
        .await?;

        let index: HashMap<EntityId, usize> = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();

        for (entity_id, meta_key, meta_value) in meta {
            if let Some(&i) = index.get(&entity_id) {
                entities[i].meta.insert(meta_key, meta_value);
            }
        }
        for (entity_id, taxonomy, name) in tags {
            if let Some(&i) = index.get(&entity_id) {
                entities[i].terms.entry(taxonomy).or_default().push(name);
            }
        }

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TermAssignment;

    async fn store() -> SqliteContentStore {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        SqliteContentStore::new(pool)
    }

    fn write(external_id: &str, title: Option<&str>) -> EntityWrite {
        let mut meta = BTreeMap::new();
        meta.insert(EXTERNAL_ID_META_KEY.to_string(), external_id.to_string());
        EntityWrite {
            title: title.map(str::to_string),
            meta,
            terms: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_find_and_load() {
        let store = store().await;
        let mut w = write("ext-1", Some("Longa Riyad"));
        w.terms.push(TermAssignment {
            taxonomy: "maqam".into(),
            name: Some("Nahawand".into()),
        });

        let key = store.create_entity(&w).await.unwrap();
        assert_eq!(key.slug, "longa-riyad");

        let found = store.find_by_meta(EXTERNAL_ID_META_KEY, "ext-1").await.unwrap();
        assert_eq!(found, vec![key.clone()]);

        let entity = store.load_entity(key.id).await.unwrap().unwrap();
        assert_eq!(entity.title, "Longa Riyad");
        assert_eq!(entity.status, EntityStatus::Publish);
        assert_eq!(entity.meta_value(EXTERNAL_ID_META_KEY), Some("ext-1"));
        assert_eq!(entity.first_term("maqam"), Some("Nahawand"));
    }

    #[tokio::test]
    async fn test_create_without_title_is_rejected() {
        let store = store().await;
        let err = store.create_entity(&write("ext-1", None)).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_external_id_is_unique_violation() {
        let store = store().await;
        store.create_entity(&write("ext-1", Some("A"))).await.unwrap();

        let err = store.create_entity(&write("ext-1", Some("B"))).await.unwrap_err();
        assert!(err.is_unique_violation());

        // The failed transaction left nothing behind
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entities")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_trashed_entities_are_invisible_and_purged_on_create() {
        let store = store().await;
        let old = store.create_entity(&write("ext-1", Some("Old"))).await.unwrap();

        sqlx::query("UPDATE entities SET status = 'trash' WHERE id = ?")
            .bind(old.id)
            .execute(store.pool())
            .await
            .unwrap();

        assert!(store.find_by_meta(EXTERNAL_ID_META_KEY, "ext-1").await.unwrap().is_empty());
        assert!(store.update_entity(old.id, &write("ext-1", None)).await.unwrap().is_none());

        let new = store.create_entity(&write("ext-1", Some("New"))).await.unwrap();
        assert_ne!(new.id, old.id);
        assert!(store.load_entity(old.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_untouched_fields() {
        let store = store().await;
        let mut w = write("ext-1", Some("First Title"));
        w.meta.insert("_transcriptions_composer".into(), "Sayyid Darwish".into());
        let key = store.create_entity(&w).await.unwrap();

        let mut update = EntityWrite {
            title: Some("Second Title".into()),
            ..Default::default()
        };
        update.meta.insert("_transcriptions_form".into(), "Dawr".into());
        let updated = store.update_entity(key.id, &update).await.unwrap().unwrap();

        assert_eq!(updated.slug, "first-title");
        let entity = store.load_entity(key.id).await.unwrap().unwrap();
        assert_eq!(entity.title, "Second Title");
        assert_eq!(entity.meta_value("_transcriptions_composer"), Some("Sayyid Darwish"));
        assert_eq!(entity.meta_value("_transcriptions_form"), Some("Dawr"));
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let store = store().await;
        let mut w = write("ext-1", Some("Gone"));
        w.terms.push(TermAssignment {
            taxonomy: "maqam".into(),
            name: Some("Kurd".into()),
        });
        let key = store.create_entity(&w).await.unwrap();

        assert!(store.delete_entity(key.id).await.unwrap());
        assert!(!store.delete_entity(key.id).await.unwrap());

        let meta: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entity_meta")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(meta, 0);
        assert!(store.find_by_meta(EXTERNAL_ID_META_KEY, "ext-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_with_meta_filters_status_and_key() {
        let store = store().await;
        store.create_entity(&write("b", Some("beta"))).await.unwrap();
        store.create_entity(&write("a", Some("Alpha"))).await.unwrap();
        let draft = store.create_entity(&write("c", Some("Gamma"))).await.unwrap();

        sqlx::query("UPDATE entities SET status = 'draft' WHERE id = ?")
            .bind(draft.id)
            .execute(store.pool())
            .await
            .unwrap();

        let listed = store
            .list_with_meta(EXTERNAL_ID_META_KEY, EntityStatus::Publish)
            .await
            .unwrap();
        let titles: Vec<&str> = listed.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "beta"]);
        assert_eq!(listed[0].meta_value(EXTERNAL_ID_META_KEY), Some("a"));
    }
}
