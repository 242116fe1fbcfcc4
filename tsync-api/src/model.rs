//! Transcription record types
//!
//! `RecordPayload` is what the external content source sends; every field is
//! optional so that absent fields can be told apart from fields explicitly sent
//! as an empty string. `TranscriptionRecord` is the full field set read back
//! from the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tsync_common::db::{EXTERNAL_ID_META_KEY, MAQAM_TAXONOMY, META_PREFIX};

use crate::store::{EntityKey, EntityStatus, StoredEntity};

/// Attached-field key for the last successful sync timestamp
pub const LAST_SYNCED_META_KEY: &str = "_transcriptions_last_synced_at";

/// How a simple attached field is cleaned before it is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    PlainText,
    Url,
    RichText,
}

/// Attached fields written by the sync layer, besides the identifier and title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Composer,
    Form,
    Rhythm,
    PdfUrl,
    About,
    BodyText,
    Translation,
    Analysis,
}

impl RecordField {
    pub const ALL: [RecordField; 8] = [
        RecordField::Composer,
        RecordField::Form,
        RecordField::Rhythm,
        RecordField::PdfUrl,
        RecordField::About,
        RecordField::BodyText,
        RecordField::Translation,
        RecordField::Analysis,
    ];

    /// Name used on the wire and in error messages
    pub fn wire_name(self) -> &'static str {
        match self {
            RecordField::Composer => "composer",
            RecordField::Form => "form",
            RecordField::Rhythm => "rhythm",
            RecordField::PdfUrl => "pdfUrl",
            RecordField::About => "about",
            RecordField::BodyText => "text",
            RecordField::Translation => "translation",
            RecordField::Analysis => "analysis",
        }
    }

    /// Full attached-field key (prefixed)
    pub fn meta_key(self) -> String {
        let suffix = match self {
            RecordField::Composer => "composer",
            RecordField::Form => "form",
            RecordField::Rhythm => "rhythm",
            RecordField::PdfUrl => "pdf_url",
            RecordField::About => "about",
            RecordField::BodyText => "text",
            RecordField::Translation => "translation",
            RecordField::Analysis => "analysis",
        };
        format!("{}{}", META_PREFIX, suffix)
    }

    pub fn policy(self) -> FieldPolicy {
        match self {
            RecordField::Composer | RecordField::Form | RecordField::Rhythm => FieldPolicy::PlainText,
            RecordField::PdfUrl => FieldPolicy::Url,
            RecordField::About
            | RecordField::BodyText
            | RecordField::Translation
            | RecordField::Analysis => FieldPolicy::RichText,
        }
    }
}

/// Incoming record from the external content source
///
/// Accepts both the camelCase wire names and the upstream's snake_case names
/// (`contentful_id`, `iqa_rhythm`, `pdf_url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    #[serde(alias = "external_id", alias = "contentful_id")]
    pub external_id: Option<String>,
    pub title: Option<String>,
    pub composer: Option<String>,
    #[serde(alias = "maqamTag")]
    pub maqam: Option<String>,
    pub form: Option<String>,
    #[serde(alias = "iqa_rhythm")]
    pub rhythm: Option<String>,
    #[serde(alias = "pdf_url")]
    pub pdf_url: Option<String>,
    pub about: Option<String>,
    #[serde(rename = "text", alias = "bodyText")]
    pub body_text: Option<String>,
    pub translation: Option<String>,
    pub analysis: Option<String>,
}

impl RecordPayload {
    /// Payload carrying only an identifier and a title
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Value sent for a simple attached field, if the field was present
    pub fn field(&self, field: RecordField) -> Option<&str> {
        let value = match field {
            RecordField::Composer => &self.composer,
            RecordField::Form => &self.form,
            RecordField::Rhythm => &self.rhythm,
            RecordField::PdfUrl => &self.pdf_url,
            RecordField::About => &self.about,
            RecordField::BodyText => &self.body_text,
            RecordField::Translation => &self.translation,
            RecordField::Analysis => &self.analysis,
        };
        value.as_deref()
    }
}

/// Reference to a persisted content entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: i64,
    pub slug: String,
    /// Canonical URL derived from the site URL and the slug
    pub url: String,
}

impl EntityRef {
    pub fn from_key(key: EntityKey, site_base: &str) -> Self {
        let url = canonical_url(site_base, &key.slug);
        Self {
            id: key.id,
            slug: key.slug,
            url,
        }
    }
}

/// Canonical URL for an entity slug
pub fn canonical_url(site_base: &str, slug: &str) -> String {
    format!("{}/{}/", site_base.trim_end_matches('/'), slug)
}

/// Full field set of a synced transcription
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRecord {
    pub entity_id: i64,
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub status: EntityStatus,
    pub composer: Option<String>,
    pub maqam: Option<String>,
    pub form: Option<String>,
    pub rhythm: Option<String>,
    pub pdf_url: Option<String>,
    pub about: Option<String>,
    #[serde(rename = "text")]
    pub body_text: Option<String>,
    pub translation: Option<String>,
    pub analysis: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl TranscriptionRecord {
    pub fn from_stored(entity: StoredEntity, site_base: &str) -> Self {
        let field = |f: RecordField| entity.meta.get(&f.meta_key()).cloned();

        Self {
            entity_id: entity.id,
            external_id: entity
                .meta
                .get(EXTERNAL_ID_META_KEY)
                .cloned()
                .unwrap_or_default(),
            url: canonical_url(site_base, &entity.slug),
            status: entity.status,
            composer: field(RecordField::Composer),
            maqam: entity.first_term(MAQAM_TAXONOMY).map(str::to_string),
            form: field(RecordField::Form),
            rhythm: field(RecordField::Rhythm),
            pdf_url: field(RecordField::PdfUrl),
            about: field(RecordField::About),
            body_text: field(RecordField::BodyText),
            translation: field(RecordField::Translation),
            analysis: field(RecordField::Analysis),
            last_synced_at: entity
                .meta
                .get(LAST_SYNCED_META_KEY)
                .and_then(|v| tsync_common::time::from_storage_string(v)),
            title: entity.title,
        }
    }
}
