use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TaxonomyError;

/// Localized text of one entity in one language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub name: String,
    pub description: Option<String>,
}

/// Wire form of a translation: `{languageCode, name, description?}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationEntry {
    pub language_code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Translation set keyed by language code; one entry per locale.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(into = "Vec<TranslationEntry>")]
pub struct Translations(BTreeMap<String, Translation>);

impl Translations {
    /// Validate submitted entries: at least one, no duplicated locale, non-empty names.
    pub fn from_entries(entries: Vec<TranslationEntry>) -> Result<Self, TaxonomyError> {
        if entries.is_empty() {
            return Err(TaxonomyError::Validation("at least one translation is required".into()));
        }
        let mut map = BTreeMap::new();
        for entry in entries {
            let code = entry.language_code.trim().to_string();
            models::validate::validate_language_code(&code)?;
            models::validate::validate_translation_name(&entry.name)?;
            let description = entry.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
            let translation = Translation { name: entry.name.trim().to_string(), description };
            if map.insert(code.clone(), translation).is_some() {
                return Err(TaxonomyError::Validation(format!("duplicate translation for languageCode `{code}`")));
            }
        }
        Ok(Self(map))
    }

    /// Rebuild a set from stored rows without re-validating them.
    pub fn from_stored<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Translation)>,
    {
        Self(rows.into_iter().collect())
    }

    pub fn get(&self, language_code: &str) -> Option<&Translation> { self.0.get(language_code) }

    /// Entries in ascending language-code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Translation)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl From<Translations> for Vec<TranslationEntry> {
    fn from(t: Translations) -> Self {
        t.0.into_iter()
            .map(|(language_code, tr)| TranslationEntry { language_code, name: tr.name, description: tr.description })
            .collect()
    }
}

/// Where a category lives. Illegal flag combinations cannot be expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Unassigned,
    Active { cluster_id: Uuid, order: u32 },
    Deleted { former_cluster_id: Option<Uuid> },
}

/// Flat column view of a [`Placement`], as persisted and as sent over the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementColumns {
    pub cluster_id: Option<Uuid>,
    pub order_in_cluster: Option<u32>,
    pub is_deleted: bool,
}

impl Placement {
    /// Cluster whose ordering scope the category belongs to.
    pub fn active_cluster(&self) -> Option<Uuid> {
        match self {
            Placement::Active { cluster_id, .. } => Some(*cluster_id),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool { matches!(self, Placement::Deleted { .. }) }

    pub fn is_unassigned(&self) -> bool { matches!(self, Placement::Unassigned) }

    pub fn columns(&self) -> PlacementColumns {
        match *self {
            Placement::Unassigned => PlacementColumns { cluster_id: None, order_in_cluster: None, is_deleted: false },
            Placement::Active { cluster_id, order } => PlacementColumns { cluster_id: Some(cluster_id), order_in_cluster: Some(order), is_deleted: false },
            Placement::Deleted { former_cluster_id } => PlacementColumns { cluster_id: former_cluster_id, order_in_cluster: None, is_deleted: true },
        }
    }

    pub fn from_columns(cluster_id: Option<Uuid>, order_in_cluster: Option<u32>, is_deleted: bool) -> Result<Self, TaxonomyError> {
        match (cluster_id, order_in_cluster, is_deleted) {
            (_, None, true) => Ok(Placement::Deleted { former_cluster_id: cluster_id }),
            (None, None, false) => Ok(Placement::Unassigned),
            (Some(cluster_id), Some(order), false) => Ok(Placement::Active { cluster_id, order }),
            _ => Err(TaxonomyError::Store(format!(
                "inconsistent placement columns (cluster_id={:?}, order_in_cluster={:?}, is_deleted={})",
                cluster_id, order_in_cluster, is_deleted
            ))),
        }
    }
}

impl Serialize for Placement {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns().serialize(serializer)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: Uuid,
    #[serde(rename = "orderInList")]
    pub order: u32,
    pub icon: String,
    pub is_active: bool,
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub icon: String,
    #[serde(flatten)]
    pub placement: Placement,
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub category_id: Uuid,
    #[serde(rename = "orderInCategory")]
    pub order: u32,
    pub translations: Translations,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Records that carry an `updatedAt` stamp.
pub trait Timestamped {
    fn touch(&mut self, at: DateTime<Utc>);
}

impl Timestamped for Cluster {
    fn touch(&mut self, at: DateTime<Utc>) { self.updated_at = at; }
}

impl Timestamped for Category {
    fn touch(&mut self, at: DateTime<Utc>) { self.updated_at = at; }
}

impl Timestamped for Service {
    fn touch(&mut self, at: DateTime<Utc>) { self.updated_at = at; }
}

/// An independently ordered, independently versioned collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// The top-level cluster list.
    Clusters,
    /// Active categories of one cluster.
    Cluster(Uuid),
    /// Services of one category.
    Category(Uuid),
}

impl Scope {
    pub fn key(&self) -> String {
        match self {
            Scope::Clusters => "clusters".to_string(),
            Scope::Cluster(id) => format!("cluster:{}", id),
            Scope::Category(id) => format!("category:{}", id),
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.key()) }
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCluster {
    #[serde(default)]
    pub icon: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterReplace {
    #[serde(default)]
    pub icon: String,
    pub is_active: bool,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    #[serde(default)]
    pub icon: String,
    pub order_in_cluster: Option<u32>,
    pub cluster_id: Option<Uuid>,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryReplace {
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub order_in_category: Option<u32>,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReplace {
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

/// One submitted category of a bulk sync; no id means "create".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpsert {
    pub id: Option<Uuid>,
    /// `None` keeps the stored icon on update.
    pub icon: Option<String>,
    pub order_in_cluster: Option<u32>,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

/// One submitted service of a bulk sync; no id means "create".
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpsert {
    pub id: Option<Uuid>,
    pub order_in_category: Option<u32>,
    #[serde(default)]
    pub translations: Vec<TranslationEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBulkSync {
    #[serde(default)]
    pub categories: Vec<CategoryUpsert>,
    #[serde(default)]
    pub remove_category_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceBulkSync {
    #[serde(default)]
    pub services: Vec<ServiceUpsert>,
    #[serde(default)]
    pub delete_service_ids: Vec<Uuid>,
    pub expected_version: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reassign {
    pub new_cluster_id: Option<Uuid>,
    pub order_in_cluster: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str, name: &str) -> TranslationEntry {
        TranslationEntry { language_code: code.into(), name: name.into(), description: None }
    }

    #[test]
    fn translations_reject_empty_and_duplicates() {
        assert!(matches!(Translations::from_entries(vec![]), Err(TaxonomyError::Validation(_))));
        let dup = vec![entry("en", "Tech"), entry(" en ", "Technology")];
        assert!(matches!(Translations::from_entries(dup), Err(TaxonomyError::Validation(_))));
        assert!(matches!(Translations::from_entries(vec![entry("en", " ")]), Err(TaxonomyError::Validation(_))));
    }

    #[test]
    fn translations_trim_and_sort_by_code() {
        let mut fr = entry("fr", " Technologie ");
        fr.description = Some("  ".into());
        let set = Translations::from_entries(vec![fr, entry("de", "Technik")]).unwrap();
        let codes: Vec<&str> = set.iter().map(|(c, _)| c).collect();
        assert_eq!(codes, vec!["de", "fr"]);
        let fr = set.get("fr").unwrap();
        assert_eq!(fr.name, "Technologie");
        assert_eq!(fr.description, None);
    }

    #[test]
    fn placement_columns_round_trip() {
        let cluster_id = Uuid::new_v4();
        for p in [
            Placement::Unassigned,
            Placement::Active { cluster_id, order: 3 },
            Placement::Deleted { former_cluster_id: Some(cluster_id) },
            Placement::Deleted { former_cluster_id: None },
        ] {
            let c = p.columns();
            assert_eq!(Placement::from_columns(c.cluster_id, c.order_in_cluster, c.is_deleted).unwrap(), p);
        }
        assert!(Placement::from_columns(Some(cluster_id), None, false).is_err());
    }

    #[test]
    fn category_serializes_flat_placement_and_translation_array() {
        let cluster_id = Uuid::new_v4();
        let now = Utc::now();
        let cat = Category {
            id: Uuid::new_v4(),
            icon: "code".into(),
            placement: Placement::Active { cluster_id, order: 1 },
            translations: Translations::from_entries(vec![entry("en", "Frontend")]).unwrap(),
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&cat).unwrap();
        assert_eq!(v["clusterId"], serde_json::json!(cluster_id));
        assert_eq!(v["orderInCluster"], 1);
        assert_eq!(v["isDeleted"], false);
        assert_eq!(v["translations"][0]["languageCode"], "en");
        assert!(v["translations"][0].get("description").is_none());
    }

    #[test]
    fn scope_keys() {
        let id = Uuid::nil();
        assert_eq!(Scope::Clusters.key(), "clusters");
        assert_eq!(Scope::Cluster(id).key(), format!("cluster:{}", id));
        assert_eq!(Scope::Category(id).to_string(), format!("category:{}", id));
    }
}
