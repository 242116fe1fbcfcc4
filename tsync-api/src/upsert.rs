//! Upsert engine
//!
//! Turns an incoming record into exactly one store transaction. Validation runs
//! to completion before anything is written:
//! 1. `externalId` present, non-empty and well formed
//! 2. `title` present and non-empty when the record does not exist yet
//! 3. URL fields parse as http(s) URLs
//!
//! Fields absent from the payload are left untouched on update. Fields sent as
//! an empty string are stored empty; an empty `maqam` removes the tag.

use tracing::{debug, warn};
use tsync_common::db::{EXTERNAL_ID_META_KEY, MAQAM_TAXONOMY};
use tsync_common::time;

use crate::context::AppContext;
use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityIndex;
use crate::model::{EntityRef, FieldPolicy, RecordField, RecordPayload, LAST_SYNCED_META_KEY};
use crate::sanitize::{self, is_valid_external_id};
use crate::store::{EntityWrite, TermAssignment};

/// Result of a successful upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub entity: EntityRef,
    pub external_id: String,
    /// True when a new entity was created
    pub created: bool,
}

pub struct UpsertEngine<'a> {
    ctx: &'a AppContext,
}

impl<'a> UpsertEngine<'a> {
    pub fn new(ctx: &'a AppContext) -> Self {
        Self { ctx }
    }

    /// Create or update the entity identified by the payload's `externalId`
    pub async fn upsert(&self, payload: &RecordPayload) -> SyncResult<UpsertOutcome> {
        let external_id = validated_external_id(payload.external_id.as_deref())?;
        let existing = IdentityIndex::new(self.ctx)
            .find_by_external_id(&external_id)
            .await?;

        if existing.is_none() && clean_title(payload).is_none() {
            return Err(SyncError::MissingField("title"));
        }
        let write = build_write(&external_id, payload)?;

        let outcome = match existing {
            Some(entity) => match self.apply_update(&external_id, entity, &write).await? {
                Some(outcome) => outcome,
                // Deleted between lookup and write
                None => self.apply_create(&external_id, payload, &write).await?,
            },
            None => self.apply_create(&external_id, payload, &write).await?,
        };

        self.notify_saved(&outcome);
        Ok(outcome)
    }

    /// Update an existing entity; the given id wins over any id in the payload
    pub async fn update(&self, external_id: &str, payload: &RecordPayload) -> SyncResult<UpsertOutcome> {
        let external_id = validated_external_id(Some(external_id))?;
        let existing = IdentityIndex::new(self.ctx)
            .find_by_external_id(&external_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(external_id.clone()))?;

        let write = build_write(&external_id, payload)?;

        let outcome = self
            .apply_update(&external_id, existing, &write)
            .await?
            .ok_or_else(|| SyncError::NotFound(external_id.clone()))?;

        self.notify_saved(&outcome);
        Ok(outcome)
    }

    /// Permanently delete the entity holding `external_id`
    pub async fn delete(&self, external_id: &str) -> SyncResult<()> {
        let entity = IdentityIndex::new(self.ctx)
            .find_by_external_id(external_id)
            .await?
            .ok_or_else(|| SyncError::NotFound(external_id.to_string()))?;

        if !self.ctx.store.delete_entity(entity.id).await? {
            return Err(SyncError::NotFound(external_id.to_string()));
        }

        self.ctx.observer.on_entity_deleted(external_id);
        Ok(())
    }

    async fn apply_update(
        &self,
        external_id: &str,
        entity: EntityRef,
        write: &EntityWrite,
    ) -> SyncResult<Option<UpsertOutcome>> {
        let updated = self.ctx.store.update_entity(entity.id, write).await?;

        Ok(updated.map(|key| UpsertOutcome {
            entity: EntityRef::from_key(key, &self.ctx.site_base),
            external_id: external_id.to_string(),
            created: false,
        }))
    }

    async fn apply_create(
        &self,
        external_id: &str,
        payload: &RecordPayload,
        write: &EntityWrite,
    ) -> SyncResult<UpsertOutcome> {
        // Reached from the update branch when the entity vanished; title is
        // required again
        let title = clean_title(payload).ok_or(SyncError::MissingField("title"))?;
        let create = EntityWrite {
            title: Some(title),
            ..write.clone()
        };

        match self.ctx.store.create_entity(&create).await {
            Ok(key) => Ok(UpsertOutcome {
                entity: EntityRef::from_key(key, &self.ctx.site_base),
                external_id: external_id.to_string(),
                created: true,
            }),
            Err(e) if e.is_unique_violation() => {
                warn!(
                    "Concurrent create for external id {}; applying as update",
                    external_id
                );
                let winner = IdentityIndex::new(self.ctx)
                    .find_by_external_id(external_id)
                    .await?
                    .ok_or(SyncError::Store(e))?;

                self.apply_update(external_id, winner, write)
                    .await?
                    .ok_or_else(|| SyncError::NotFound(external_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn notify_saved(&self, outcome: &UpsertOutcome) {
        self.ctx
            .observer
            .on_entity_saved(&outcome.entity, &outcome.external_id, outcome.created);
    }
}

fn validated_external_id(value: Option<&str>) -> SyncResult<String> {
    let id = value.map(str::trim).unwrap_or_default();
    if id.is_empty() {
        return Err(SyncError::MissingField("externalId"));
    }
    if !is_valid_external_id(id) {
        return Err(SyncError::InvalidField {
            field: "externalId",
            reason: "only letters, digits, '-' and '_' are allowed".to_string(),
        });
    }
    Ok(id.to_string())
}

/// Sanitized title, `None` when absent or empty after cleaning
fn clean_title(payload: &RecordPayload) -> Option<String> {
    payload
        .title
        .as_deref()
        .map(sanitize::plain_text)
        .filter(|t| !t.is_empty())
}

/// Build the store write for a validated payload
///
/// Fails only on malformed URL fields. An empty title maps to "keep the
/// current title".
fn build_write(external_id: &str, payload: &RecordPayload) -> SyncResult<EntityWrite> {
    let mut write = EntityWrite {
        title: clean_title(payload),
        ..Default::default()
    };

    write
        .meta
        .insert(EXTERNAL_ID_META_KEY.to_string(), external_id.to_string());

    for field in RecordField::ALL {
        let Some(raw) = payload.field(field) else {
            continue;
        };
        let value = match field.policy() {
            FieldPolicy::PlainText => sanitize::plain_text(raw),
            FieldPolicy::Url => sanitize::url_field(field.wire_name(), raw)?,
            FieldPolicy::RichText => sanitize::rich_text(raw),
        };
        write.meta.insert(field.meta_key(), value);
    }

    if let Some(raw) = payload.maqam.as_deref() {
        let name = sanitize::plain_text(raw);
        write.terms.push(TermAssignment {
            taxonomy: MAQAM_TAXONOMY.to_string(),
            name: (!name.is_empty()).then_some(name),
        });
    }

    write.meta.insert(
        LAST_SYNCED_META_KEY.to_string(),
        time::to_storage_string(time::now()),
    );

    debug!(
        "Prepared write for {}: {} field(s), {} tag assignment(s)",
        external_id,
        write.meta.len(),
        write.terms.len()
    );
    Ok(write)
}
