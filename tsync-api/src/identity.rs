//! Identity index: external identifier -> local entity

use tracing::warn;
use tsync_common::db::EXTERNAL_ID_META_KEY;

use crate::context::AppContext;
use crate::error::SyncResult;
use crate::model::{EntityRef, TranscriptionRecord};

/// Resolves external identifiers against the identity attribute
pub struct IdentityIndex<'a> {
    ctx: &'a AppContext,
}

impl<'a> IdentityIndex<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Entity currently holding `external_id`, if any
    ///
    /// Trashed entities never match. When several live entities hold the id,
    /// the most recently created one wins.
    pub async fn find_by_external_id(&self, external_id: &str) -> SyncResult<Option<EntityRef>> {
        if external_id.is_empty() {
            return Ok(None);
        }

        let mut matches = self
            .ctx
            .store
            .find_by_meta(EXTERNAL_ID_META_KEY, external_id)
            .await?;

        if matches.len() > 1 {
            warn!(
                "{} entities hold external id {}; using entity {}",
                matches.len(),
                external_id,
                matches[0].id
            );
        }

        if matches.is_empty() {
            return Ok(None);
        }
        let key = matches.swap_remove(0);
        Ok(Some(EntityRef::from_key(key, &self.ctx.site_base)))
    }

    /// Full record for `external_id`, if a live entity holds it
    pub async fn load_record(&self, external_id: &str) -> SyncResult<Option<TranscriptionRecord>> {
        let Some(entity) = self.find_by_external_id(external_id).await? else {
            return Ok(None);
        };

        let stored = self.ctx.store.load_entity(entity.id).await?;
        Ok(stored.map(|e| TranscriptionRecord::from_stored(e, &self.ctx.site_base)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticCapability;
    use crate::store::{
        ContentStore, EntityId, EntityKey, EntityStatus, EntityWrite, StoredEntity,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tsync_common::Result;

    /// Store that already holds two live entities for the same id
    #[derive(Default)]
    struct DuplicateStore {
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl ContentStore for DuplicateStore {
        async fn find_by_meta(&self, _key: &str, _value: &str) -> Result<Vec<EntityKey>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                EntityKey { id: 9, slug: "newer".into() },
                EntityKey { id: 4, slug: "older".into() },
            ])
        }

        async fn create_entity(&self, _write: &EntityWrite) -> Result<EntityKey> {
            unreachable!()
        }

        async fn update_entity(&self, _id: EntityId, _write: &EntityWrite) -> Result<Option<EntityKey>> {
            unreachable!()
        }

        async fn load_entity(&self, _id: EntityId) -> Result<Option<StoredEntity>> {
            Ok(None)
        }

        async fn delete_entity(&self, _id: EntityId) -> Result<bool> {
            unreachable!()
        }

        async fn list_with_meta(&self, _key: &str, _status: EntityStatus) -> Result<Vec<StoredEntity>> {
            Ok(Vec::new())
        }
    }

    fn context(store: Arc<DuplicateStore>) -> AppContext {
        AppContext::new(store, Arc::new(StaticCapability(true)), "https://site.test/")
    }

    #[tokio::test]
    async fn test_newest_duplicate_wins() {
        let store = Arc::new(DuplicateStore::default());
        let ctx = context(store.clone());

        let found = IdentityIndex::new(&ctx)
            .find_by_external_id("abc")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.id, 9);
        assert_eq!(found.url, "https://site.test/newer/");
    }

    #[tokio::test]
    async fn test_empty_id_does_not_touch_store() {
        let store = Arc::new(DuplicateStore::default());
        let ctx = context(store.clone());

        let found = IdentityIndex::new(&ctx).find_by_external_id("").await.unwrap();

        assert!(found.is_none());
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }
}
