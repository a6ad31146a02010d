use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::domain::{Category, Cluster, Scope, Service, Translations};
use super::repository::{CategoryFilter, TaxonomyStore};
use super::translation::{ResolvedLabel, TranslationResolver};

/// A record plus its label in the requested locale, when one was asked for.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Labeled<T> {
    #[serde(flatten)]
    pub item: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ResolvedLabel>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    #[serde(flatten)]
    pub service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ResolvedLabel>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ResolvedLabel>,
    /// Stamp to send back as `expectedVersion` when editing these services.
    pub services_version: u64,
    pub services: Vec<ServiceNode>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNode {
    #[serde(flatten)]
    pub cluster: Cluster,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<ResolvedLabel>,
    pub categories_version: u64,
    pub categories: Vec<CategoryNode>,
}

/// Every cluster with its active categories and their services.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyTree {
    /// Stamp of the top-level cluster list.
    pub version: u64,
    pub clusters: Vec<ClusterNode>,
}

pub struct QueryService<S: TaxonomyStore + ?Sized> {
    store: Arc<S>,
    resolver: TranslationResolver,
}

impl<S: TaxonomyStore + ?Sized> QueryService<S> {
    pub fn new(store: Arc<S>, resolver: TranslationResolver) -> Self { Self { store, resolver } }

    fn label(&self, translations: &Translations, locale: Option<&str>) -> Result<Option<ResolvedLabel>, TaxonomyError> {
        locale.map(|l| self.resolver.resolve(translations, l)).transpose()
    }

    fn labeled<T>(&self, item: T, translations: &Translations, locale: Option<&str>) -> Result<Labeled<T>, TaxonomyError> {
        Ok(Labeled { label: self.label(translations, locale)?, item })
    }

    /// Clusters are listed whether or not they are flagged active.
    #[instrument(skip(self))]
    pub async fn active_tree(&self, locale: Option<&str>) -> Result<TaxonomyTree, TaxonomyError> {
        // Stamps are taken before the data they describe: a stamp may lag the
        // data (the client sees a spurious conflict) but never run ahead of it.
        let mut scopes = vec![Scope::Clusters];
        scopes.extend(self.store.clusters().await?.iter().map(|c| Scope::Cluster(c.id)));
        scopes.extend(self.store.categories(CategoryFilter::Active).await?.iter().map(|c| Scope::Category(c.id)));
        let versions = self.store.versions(&scopes).await?;
        // Scopes that appeared after the snapshot report 0.
        let version_of = |s: Scope| versions.get(&s).copied().unwrap_or(0);

        let clusters = self.store.clusters().await?;
        let categories = self.store.categories(CategoryFilter::Active).await?;
        let category_ids: Vec<Uuid> = categories.iter().map(|c| c.id).collect();
        let services = self.store.services(&category_ids).await?;

        let mut services_by_category: HashMap<Uuid, Vec<ServiceNode>> = HashMap::new();
        for service in services {
            let label = self.label(&service.translations, locale)?;
            services_by_category.entry(service.category_id).or_default().push(ServiceNode { service, label });
        }
        let mut categories_by_cluster: HashMap<Uuid, Vec<CategoryNode>> = HashMap::new();
        for category in categories {
            let Some(cluster_id) = category.placement.active_cluster() else { continue };
            let label = self.label(&category.translations, locale)?;
            let services = services_by_category.remove(&category.id).unwrap_or_default();
            let services_version = version_of(Scope::Category(category.id));
            categories_by_cluster
                .entry(cluster_id)
                .or_default()
                .push(CategoryNode { category, label, services_version, services });
        }
        let mut nodes = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let label = self.label(&cluster.translations, locale)?;
            let categories = categories_by_cluster.remove(&cluster.id).unwrap_or_default();
            let categories_version = version_of(Scope::Cluster(cluster.id));
            nodes.push(ClusterNode { cluster, label, categories_version, categories });
        }
        debug!(clusters = nodes.len(), "tree loaded");
        Ok(TaxonomyTree { version: version_of(Scope::Clusters), clusters: nodes })
    }

    #[instrument(skip(self))]
    pub async fn unassigned(&self, locale: Option<&str>) -> Result<Vec<Labeled<Category>>, TaxonomyError> {
        self.category_list(CategoryFilter::Unassigned, locale).await
    }

    #[instrument(skip(self))]
    pub async fn soft_deleted(&self, locale: Option<&str>) -> Result<Vec<Labeled<Category>>, TaxonomyError> {
        self.category_list(CategoryFilter::Deleted, locale).await
    }

    async fn category_list(&self, filter: CategoryFilter, locale: Option<&str>) -> Result<Vec<Labeled<Category>>, TaxonomyError> {
        let categories = self.store.categories(filter).await?;
        categories
            .into_iter()
            .map(|c| {
                let label = self.label(&c.translations, locale)?;
                Ok(Labeled { item: c, label })
            })
            .collect()
    }

    pub async fn cluster(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Cluster>, TaxonomyError> {
        let cluster = self.store.cluster(id).await?.ok_or_else(|| TaxonomyError::not_found("cluster", id))?;
        let translations = cluster.translations.clone();
        self.labeled(cluster, &translations, locale)
    }

    pub async fn category(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Category>, TaxonomyError> {
        let category = self.store.category(id).await?.ok_or_else(|| TaxonomyError::not_found("category", id))?;
        let translations = category.translations.clone();
        self.labeled(category, &translations, locale)
    }

    pub async fn service(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Service>, TaxonomyError> {
        let service = self.store.service(id).await?.ok_or_else(|| TaxonomyError::not_found("service", id))?;
        let translations = service.translations.clone();
        self.labeled(service, &translations, locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::domain::{NewCategory, NewService, TranslationEntry};
    use crate::test_support::{en, interleaved_services, memory_service, new_cluster, seed_categories, Interleave};

    #[tokio::test]
    async fn tree_nests_levels_in_order_and_skips_inactive_placements() {
        let svc = memory_service();
        let a = svc.create_cluster(new_cluster("A")).await.unwrap();
        let b = svc.create_cluster(new_cluster("B")).await.unwrap();
        let cats = seed_categories(&svc, a.id, &["a0", "a1"]).await;
        svc.create_category(NewCategory { icon: String::new(), order_in_cluster: None, cluster_id: None, translations: en("loose") })
            .await
            .unwrap();
        svc.soft_delete_category(cats[0].id).await.unwrap();
        svc.create_service(cats[1].id, NewService { order_in_category: None, translations: en("s0") }).await.unwrap();

        let tree = svc.tree(None).await.unwrap();
        assert_eq!(tree.clusters.iter().map(|c| c.cluster.id).collect::<Vec<_>>(), vec![a.id, b.id]);
        assert_eq!(tree.clusters[0].categories.len(), 1);
        assert_eq!(tree.clusters[0].categories[0].category.id, cats[1].id);
        assert_eq!(tree.clusters[0].categories[0].services.len(), 1);
        assert!(tree.clusters[1].categories.is_empty());
        assert!(tree.version >= 2);
        assert!(tree.clusters[0].label.is_none());

        assert_eq!(svc.unassigned(None).await.unwrap().len(), 1);
        assert_eq!(svc.soft_deleted(None).await.unwrap()[0].item.id, cats[0].id);
    }

    #[tokio::test]
    async fn tree_stamps_never_run_ahead_of_data() {
        let (svc, store, direct) = interleaved_services(Interleave::OnServicesRead);
        let tech = direct.create_cluster(new_cluster("Tech")).await.unwrap();
        let cats = seed_categories(&direct, tech.id, &["a", "b"]).await;
        let (a, b) = (cats[0].id, cats[1].id);

        // a reorder lands after the categories were read
        let racer = direct.clone();
        store.arm(async move { racer.reorder_categories(tech.id, &[b, a], None).await.expect("reorder"); }).await;
        let tree = svc.tree(None).await.unwrap();
        let shown: Vec<Uuid> = tree.clusters[0].categories.iter().map(|n| n.category.id).collect();
        assert_eq!(shown, vec![a, b]);

        let stamp = tree.clusters[0].categories_version;
        let err = svc.reorder_categories(tech.id, &[b, a], Some(stamp)).await.unwrap_err();
        assert!(matches!(err, TaxonomyError::OrderConflict(_)));
    }

    #[tokio::test]
    async fn labels_follow_locale_fallback() {
        let svc = memory_service();
        let mut input = new_cluster("Tech");
        input.translations.push(TranslationEntry { language_code: "fr".into(), name: "Technologie".into(), description: None });
        let tech = svc.create_cluster(input).await.unwrap();

        let fr = svc.cluster(tech.id, Some("fr")).await.unwrap();
        assert_eq!(fr.label.unwrap().name, "Technologie");
        let de = svc.cluster(tech.id, Some("de")).await.unwrap();
        assert_eq!(de.label.unwrap().language_code, "en");

        let tree = svc.tree(Some("fr")).await.unwrap();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["clusters"][0]["label"]["name"], "Technologie");
        assert_eq!(json["clusters"][0]["orderInList"], 0);
    }

    #[tokio::test]
    async fn single_reads_report_not_found() {
        let svc = memory_service();
        let id = Uuid::new_v4();
        assert!(matches!(svc.cluster(id, None).await, Err(TaxonomyError::NotFound(_))));
        assert!(matches!(svc.category(id, None).await, Err(TaxonomyError::NotFound(_))));
        assert!(matches!(svc.service(id, None).await, Err(TaxonomyError::NotFound(_))));
    }
}
