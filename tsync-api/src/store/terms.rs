//! Tag vocabulary: hierarchical named labels, created lazily on first use

use sqlx::SqliteConnection;
use std::collections::BTreeMap;
use tracing::info;
use tsync_common::Result;

use super::{slugify, EntityId};

/// Find a term by exact (case-sensitive) name, creating a top-level term if absent
pub(crate) async fn resolve_or_create(
    conn: &mut SqliteConnection,
    taxonomy: &str,
    name: &str,
) -> Result<i64> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM terms WHERE taxonomy = ? AND name = ?")
            .bind(taxonomy)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

    if let Some(id) = existing {
        return Ok(id);
    }

    let result = sqlx::query("INSERT INTO terms (taxonomy, name, slug) VALUES (?, ?, ?)")
        .bind(taxonomy)
        .bind(name)
        .bind(slugify(name))
        .execute(&mut *conn)
        .await?;

    info!("Created {} term '{}'", taxonomy, name);
    Ok(result.last_insert_rowid())
}

/// Replace the entity's tags in one taxonomy with a single term (or none)
pub(crate) async fn set_entity_term(
    conn: &mut SqliteConnection,
    entity_id: EntityId,
    taxonomy: &str,
    term_id: Option<i64>,
) -> Result<()> {
    sqlx::query("DELETE FROM entity_terms WHERE entity_id = ? AND taxonomy = ?")
        .bind(entity_id)
        .bind(taxonomy)
        .execute(&mut *conn)
        .await?;

    if let Some(term_id) = term_id {
        sqlx::query("INSERT INTO entity_terms (entity_id, term_id, taxonomy) VALUES (?, ?, ?)")
            .bind(entity_id)
            .bind(term_id)
            .bind(taxonomy)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Tag names per taxonomy for one entity, sorted by name
pub(crate) async fn load_entity_terms(
    conn: &mut SqliteConnection,
    entity_id: EntityId,
) -> Result<BTreeMap<String, Vec<String>>> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT et.taxonomy, t.name
        FROM entity_terms et
        JOIN terms t ON t.id = et.term_id
        WHERE et.entity_id = ?
        ORDER BY et.taxonomy, t.name
        "#,
    )
    .bind(entity_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut terms: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (taxonomy, name) in rows {
        terms.entry(taxonomy).or_default().push(name);
    }
    Ok(terms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_reuses_existing_term() {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let first = resolve_or_create(&mut conn, "maqam", "Hijaz").await.unwrap();
        let second = resolve_or_create(&mut conn, "maqam", "Hijaz").await.unwrap();
        assert_eq!(first, second);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM terms")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_resolve_is_case_sensitive() {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let upper = resolve_or_create(&mut conn, "maqam", "Rast").await.unwrap();
        let lower = resolve_or_create(&mut conn, "maqam", "rast").await.unwrap();
        assert_ne!(upper, lower);
    }

    #[tokio::test]
    async fn test_set_entity_term_replaces_previous() {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        sqlx::query("INSERT INTO entities (title, slug) VALUES ('t', 't')")
            .execute(&mut *conn)
            .await
            .unwrap();

        let bayati = resolve_or_create(&mut conn, "maqam", "Bayati").await.unwrap();
        let saba = resolve_or_create(&mut conn, "maqam", "Saba").await.unwrap();

        set_entity_term(&mut conn, 1, "maqam", Some(bayati)).await.unwrap();
        set_entity_term(&mut conn, 1, "maqam", Some(saba)).await.unwrap();

        let terms = load_entity_terms(&mut conn, 1).await.unwrap();
        assert_eq!(terms.get("maqam").unwrap(), &vec!["Saba".to_string()]);

        set_entity_term(&mut conn, 1, "maqam", None).await.unwrap();
        let terms = load_entity_terms(&mut conn, 1).await.unwrap();
        assert!(terms.get("maqam").is_none());
    }
}
