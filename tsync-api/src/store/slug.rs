//! Slug generation for entity URLs

use sqlx::SqliteConnection;
use tsync_common::Result;

/// Fallback slug when a title has no usable characters
const FALLBACK_SLUG: &str = "transcription";

/// Lowercase the title, keep alphanumerics (any script), fold everything else to `-`
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// First free slug for a title: `base`, then `base-2`, `base-3`, ...
pub(crate) async fn unique_slug(conn: &mut SqliteConnection, title: &str) -> Result<String> {
    let base = slugify(title);
    let mut candidate = base.clone();
    let mut suffix = 2;

    loop {
        let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM entities WHERE slug = ?")
            .bind(&candidate)
            .fetch_optional(&mut *conn)
            .await?;

        if taken.is_none() {
            return Ok(candidate);
        }

        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_ascii() {
        assert_eq!(slugify("Longa Nahawand"), "longa-nahawand");
        assert_eq!(slugify("  Sama'i Bayati -- (Jamil Bey) "), "sama-i-bayati-jamil-bey");
    }

    #[test]
    fn test_slugify_keeps_other_scripts() {
        assert_eq!(slugify("لونغا نهاوند"), "لونغا-نهاوند");
    }

    #[test]
    fn test_slugify_fallback() {
        assert_eq!(slugify("!!!"), "transcription");
        assert_eq!(slugify(""), "transcription");
    }

    #[tokio::test]
    async fn test_unique_slug_appends_suffix() {
        let pool = tsync_common::db::init_memory_database().await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        assert_eq!(unique_slug(&mut conn, "Longa").await.unwrap(), "longa");

        sqlx::query("INSERT INTO entities (title, slug) VALUES ('Longa', 'longa'), ('Longa', 'longa-2')")
            .execute(&mut *conn)
            .await
            .unwrap();

        assert_eq!(unique_slug(&mut conn, "Longa").await.unwrap(), "longa-3");
    }
}
