//! Grouped listing of published transcriptions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tsync_common::db::EXTERNAL_ID_META_KEY;

use crate::error::SyncResult;
use crate::model::TranscriptionRecord;
use crate::store::{ContentStore, EntityStatus};

/// Group key used for records without a form
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Maqam,
    Composer,
    Form,
}

impl GroupBy {
    /// Parse a `groupby` query value; unknown values fall back to maqam
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("composer") => GroupBy::Composer,
            Some("form") => GroupBy::Form,
            _ => GroupBy::Maqam,
        }
    }
}

/// Query string of the list route
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub groupby: Option<String>,
}

/// One record in a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListEntry {
    pub external_id: String,
    pub title: String,
    pub url: String,
    pub composer: Option<String>,
    pub maqam: Option<String>,
    pub form: Option<String>,
}

impl From<TranscriptionRecord> for ListEntry {
    fn from(record: TranscriptionRecord) -> Self {
        Self {
            external_id: record.external_id,
            title: record.title,
            url: record.url,
            composer: record.composer,
            maqam: record.maqam,
            form: record.form,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryGroup {
    pub key: String,
    pub entries: Vec<ListEntry>,
}

/// Last whitespace-separated word, lowercased
pub fn last_name(composer: &str) -> String {
    composer
        .split_whitespace()
        .last()
        .unwrap_or_default()
        .to_lowercase()
}

/// Group entries by the requested field
pub fn group_entries(entries: Vec<ListEntry>, by: GroupBy) -> Vec<EntryGroup> {
    let mut buckets: BTreeMap<String, Vec<ListEntry>> = BTreeMap::new();

    for entry in entries {
        let key = match by {
            GroupBy::Maqam => entry.maqam.clone().filter(|m| !m.is_empty()),
            GroupBy::Composer => entry.composer.clone().filter(|c| !c.trim().is_empty()),
            GroupBy::Form => Some(
                entry
                    .form
                    .clone()
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
            ),
        };
        if let Some(key) = key {
            buckets.entry(key).or_default().push(entry);
        }
    }

    let mut groups: Vec<EntryGroup> = buckets
        .into_iter()
        .map(|(key, mut entries)| {
            entries.sort_by_cached_key(|e| e.title.to_lowercase());
            EntryGroup { key, entries }
        })
        .collect();

    if by == GroupBy::Composer {
        groups.sort_by_cached_key(|g| last_name(&g.key));
    }

    groups
}

/// Load every published record and group it
pub async fn load_grouped(
    store: &dyn ContentStore,
    site_base: &str,
    by: GroupBy,
) -> SyncResult<Vec<EntryGroup>> {
    let entities = store
        .list_with_meta(EXTERNAL_ID_META_KEY, EntityStatus::Publish)
        .await?;

    let entries = entities
        .into_iter()
        .map(|e| ListEntry::from(TranscriptionRecord::from_stored(e, site_base)))
        .collect();

    Ok(group_entries(entries, by))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str, composer: Option<&str>, maqam: Option<&str>, form: Option<&str>) -> ListEntry {
        ListEntry {
            external_id: title.to_lowercase().replace(' ', "-"),
            title: title.to_string(),
            url: String::new(),
            composer: composer.map(str::to_string),
            maqam: maqam.map(str::to_string),
            form: form.map(str::to_string),
        }
    }

    fn keys(groups: &[EntryGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.key.as_str()).collect()
    }

    #[test]
    fn test_groupby_parse_falls_back_to_maqam() {
        assert_eq!(GroupBy::parse(Some("Composer")), GroupBy::Composer);
        assert_eq!(GroupBy::parse(Some("form")), GroupBy::Form);
        assert_eq!(GroupBy::parse(Some("rhythm")), GroupBy::Maqam);
        assert_eq!(GroupBy::parse(None), GroupBy::Maqam);
    }

    #[test]
    fn test_composer_groups_sort_by_last_name() {
        let groups = group_entries(
            vec![
                entry("Piece One", Some("John Smith"), None, None),
                entry("Piece Two", Some("Jane Adams"), None, None),
                entry("Piece Three", Some(""), None, None),
                entry("Piece Four", None, None, None),
            ],
            GroupBy::Composer,
        );

        assert_eq!(keys(&groups), vec!["Jane Adams", "John Smith"]);
    }

    #[test]
    fn test_maqam_groups_skip_untagged() {
        let groups = group_entries(
            vec![
                entry("b", None, Some("Rast"), None),
                entry("a", None, Some("Bayati"), None),
                entry("c", None, None, None),
                entry("A2", None, Some("Rast"), None),
            ],
            GroupBy::Maqam,
        );

        assert_eq!(keys(&groups), vec!["Bayati", "Rast"]);
        let rast: Vec<&str> = groups[1].entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(rast, vec!["A2", "b"]);
    }

    #[test]
    fn test_form_groups_collect_uncategorized() {
        let groups = group_entries(
            vec![
                entry("x", None, None, Some("Samai")),
                entry("y", None, None, Some("")),
                entry("z", None, None, None),
                entry("w", None, None, Some("Longa")),
            ],
            GroupBy::Form,
        );

        assert_eq!(keys(&groups), vec!["Longa", "Samai", UNCATEGORIZED]);
        assert_eq!(groups[2].entries.len(), 2);
    }

    #[test]
    fn test_last_name() {
        assert_eq!(last_name("Muhammad Abd al-Wahhab"), "al-wahhab");
        assert_eq!(last_name("Farid"), "farid");
        assert_eq!(last_name("   "), "");
    }
}
