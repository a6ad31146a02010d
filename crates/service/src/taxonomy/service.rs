use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::bulk_sync::BulkSyncProcessor;
use super::domain::{
    Category, CategoryBulkSync, CategoryReplace, Cluster, ClusterReplace, NewCategory, NewCluster, NewService,
    Placement, Reassign, Scope, Service, ServiceBulkSync, ServiceReplace, Translations,
};
use super::lifecycle::{guarded_category, LifecycleManager};
use super::ordering::OrderedScope;
use super::query::{Labeled, QueryService, TaxonomyTree};
use super::repository::{ensure_version, CategoryFilter, ChangeSet, TaxonomyStore, Write};
use super::translation::TranslationResolver;

/// Entry point used by the HTTP layer: entity CRUD and reorders, plus the
/// lifecycle, bulk-sync and query components sharing one store.
pub struct TaxonomyService<S: TaxonomyStore + ?Sized> {
    store: Arc<S>,
    lifecycle: LifecycleManager<S>,
    bulk: BulkSyncProcessor<S>,
    query: QueryService<S>,
}

impl<S: TaxonomyStore + ?Sized> TaxonomyService<S> {
    pub fn new(store: Arc<S>, resolver: TranslationResolver) -> Self {
        Self {
            lifecycle: LifecycleManager::new(store.clone()),
            bulk: BulkSyncProcessor::new(store.clone()),
            query: QueryService::new(store.clone(), resolver),
            store,
        }
    }

    pub fn store(&self) -> &Arc<S> { &self.store }

    // ---- clusters ----

    #[instrument(skip(self, input))]
    pub async fn create_cluster(&self, input: NewCluster) -> Result<Cluster, TaxonomyError> {
        models::validate::validate_icon(&input.icon)?;
        let translations = Translations::from_entries(input.translations)?;
        let version = self.store.version(Scope::Clusters).await?;
        let mut clusters = self.store.clusters().await?;
        let now = Utc::now();
        let cluster = Cluster {
            id: Uuid::new_v4(),
            order: u32::MAX,
            icon: input.icon,
            is_active: input.is_active,
            translations,
            created_at: now,
            updated_at: now,
        };
        let mut scope = OrderedScope::compact(&clusters);
        scope.insert(cluster.id, None);
        clusters.push(cluster.clone());

        let mut changes = ChangeSet::new();
        changes.expect(Scope::Clusters, version);
        let mut created = cluster;
        for (c, moved) in scope.apply(clusters) {
            if c.id == created.id {
                created = c;
            } else if moved {
                let mut c = c;
                c.updated_at = now;
                changes.push(Write::PutCluster(c));
            }
        }
        changes.push(Write::PutCluster(created.clone()));
        self.store.commit(changes).await?;
        info!(cluster_id = %created.id, order = created.order, "cluster_created");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(cluster_id = %id))]
    pub async fn replace_cluster(&self, id: Uuid, input: ClusterReplace) -> Result<Cluster, TaxonomyError> {
        models::validate::validate_icon(&input.icon)?;
        let translations = Translations::from_entries(input.translations)?;
        let version = self.store.version(Scope::Clusters).await?;
        let mut cluster = self.store.cluster(id).await?.ok_or_else(|| TaxonomyError::not_found("cluster", id))?;
        cluster.icon = input.icon;
        cluster.is_active = input.is_active;
        cluster.translations = translations;
        cluster.updated_at = Utc::now();
        let mut changes = ChangeSet::new();
        changes.expect(Scope::Clusters, version).push(Write::PutCluster(cluster.clone()));
        self.store.commit(changes).await?;
        info!(cluster_id = %id, "cluster_replaced");
        Ok(cluster)
    }

    /// Delete a cluster; its active categories fall back to the unassigned pool.
    #[instrument(skip(self), fields(cluster_id = %id))]
    pub async fn delete_cluster(&self, id: Uuid) -> Result<(), TaxonomyError> {
        let versions = self.store.versions(&[Scope::Clusters, Scope::Cluster(id)]).await?;
        if self.store.cluster(id).await?.is_none() {
            return Err(TaxonomyError::not_found("cluster", id));
        }
        let now = Utc::now();
        let mut changes = ChangeSet::new();
        changes.expect_all(&versions);

        let members = self.store.categories(CategoryFilter::InCluster(id)).await?;
        let orphaned = members.len();
        for mut category in members {
            category.placement = Placement::Unassigned;
            category.updated_at = now;
            changes.push(Write::PutCategory(category));
        }
        // Deleted categories pointing here are rewritten, so each is held by
        // its own scope, stamped before the record is read again.
        let points_here = |c: &Category| c.placement == (Placement::Deleted { former_cluster_id: Some(id) });
        let history_scopes: Vec<Scope> = self
            .store
            .categories(CategoryFilter::Deleted)
            .await?
            .iter()
            .filter(|c| points_here(*c))
            .map(|c| Scope::Category(c.id))
            .collect();
        let history_versions = self.store.versions(&history_scopes).await?;
        for mut category in self.store.categories(CategoryFilter::Deleted).await? {
            if points_here(&category) {
                let scope = Scope::Category(category.id);
                changes.expect(scope, history_versions.get(&scope).copied().unwrap_or(0));
                category.placement = Placement::Deleted { former_cluster_id: None };
                category.updated_at = now;
                changes.push(Write::PutCategory(category));
            }
        }

        let clusters = self.store.clusters().await?;
        let mut scope = OrderedScope::compact(&clusters);
        scope.remove(id);
        changes.put_moved(scope.apply(clusters), now);
        changes.push(Write::DeleteCluster(id));
        self.store.commit(changes).await?;
        info!(cluster_id = %id, orphaned, "cluster_deleted");
        Ok(())
    }

    #[instrument(skip(self, ordered_ids), fields(count = ordered_ids.len()))]
    pub async fn reorder_clusters(&self, ordered_ids: &[Uuid], expected_version: Option<u64>) -> Result<Vec<Cluster>, TaxonomyError> {
        let version = self.store.version(Scope::Clusters).await?;
        ensure_version(Scope::Clusters, version, expected_version)?;
        let clusters = self.store.clusters().await?;
        let mut scope = OrderedScope::compact(&clusters);
        scope.reorder(ordered_ids)?;
        let now = Utc::now();
        let applied = scope.apply(clusters);
        let result: Vec<Cluster> = applied.iter().map(|(c, _)| c.clone()).collect();
        let mut changes = ChangeSet::new();
        changes.expect(Scope::Clusters, version).put_moved(applied, now);
        self.store.commit(changes).await?;
        info!(count = result.len(), "clusters_reordered");
        Ok(result)
    }

    // ---- categories ----

    /// Create a category, unassigned or placed in a cluster.
    #[instrument(skip(self, input), fields(cluster_id = ?input.cluster_id))]
    pub async fn create_category(&self, input: NewCategory) -> Result<Category, TaxonomyError> {
        models::validate::validate_icon(&input.icon)?;
        let translations = Translations::from_entries(input.translations)?;
        let now = Utc::now();
        let mut category = Category {
            id: Uuid::new_v4(),
            icon: input.icon,
            placement: Placement::Unassigned,
            translations,
            created_at: now,
            updated_at: now,
        };
        let mut changes = ChangeSet::new();
        match input.cluster_id {
            Some(cluster_id) => {
                let scope_key = Scope::Cluster(cluster_id);
                let version = self.store.version(scope_key).await?;
                if self.store.cluster(cluster_id).await?.is_none() {
                    return Err(TaxonomyError::not_found("cluster", cluster_id));
                }
                let members = self.store.categories(CategoryFilter::InCluster(cluster_id)).await?;
                let mut scope = OrderedScope::compact(&members);
                let order = scope.insert(category.id, input.order_in_cluster);
                category.placement = Placement::Active { cluster_id, order };
                changes.expect(scope_key, version).put_moved(scope.apply(members), now);
            }
            None if input.order_in_cluster.is_some() => {
                return Err(TaxonomyError::Validation("orderInCluster requires clusterId".into()));
            }
            None => {}
        }
        changes.push(Write::PutCategory(category.clone()));
        self.store.commit(changes).await?;
        info!(category_id = %category.id, placement = ?category.placement, "category_created");
        Ok(category)
    }

    /// Replace icon and translations; placement is left as is.
    #[instrument(skip(self, input), fields(category_id = %id))]
    pub async fn replace_category(&self, id: Uuid, input: CategoryReplace) -> Result<Category, TaxonomyError> {
        models::validate::validate_icon(&input.icon)?;
        let translations = Translations::from_entries(input.translations)?;
        let (mut category, versions) = guarded_category(&*self.store, id, &[]).await?;
        category.icon = input.icon;
        category.translations = translations;
        category.updated_at = Utc::now();
        let mut changes = ChangeSet::new();
        changes.expect_all(&versions).push(Write::PutCategory(category.clone()));
        self.store.commit(changes).await?;
        info!(category_id = %id, "category_replaced");
        Ok(category)
    }

    #[instrument(skip(self, ordered_ids), fields(cluster_id = %cluster_id, count = ordered_ids.len()))]
    pub async fn reorder_categories(
        &self,
        cluster_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<u64>,
    ) -> Result<Vec<Category>, TaxonomyError> {
        let scope_key = Scope::Cluster(cluster_id);
        let version = self.store.version(scope_key).await?;
        ensure_version(scope_key, version, expected_version)?;
        if self.store.cluster(cluster_id).await?.is_none() {
            return Err(TaxonomyError::not_found("cluster", cluster_id));
        }
        let members = self.store.categories(CategoryFilter::InCluster(cluster_id)).await?;
        let mut scope = OrderedScope::compact(&members);
        scope.reorder(ordered_ids)?;
        let applied = scope.apply(members);
        let result: Vec<Category> = applied.iter().map(|(c, _)| c.clone()).collect();
        let mut changes = ChangeSet::new();
        changes.expect(scope_key, version).put_moved(applied, Utc::now());
        self.store.commit(changes).await?;
        info!(cluster_id = %cluster_id, count = result.len(), "categories_reordered");
        Ok(result)
    }

    pub async fn soft_delete_category(&self, id: Uuid) -> Result<Category, TaxonomyError> {
        self.lifecycle.soft_delete(id).await
    }

    pub async fn restore_category(&self, id: Uuid) -> Result<Category, TaxonomyError> {
        self.lifecycle.restore(id).await
    }

    pub async fn reassign_category(&self, id: Uuid, input: Reassign) -> Result<Category, TaxonomyError> {
        self.lifecycle.reassign(id, input).await
    }

    pub async fn sync_categories(&self, cluster_id: Uuid, input: CategoryBulkSync) -> Result<Vec<Category>, TaxonomyError> {
        self.bulk.sync_categories(cluster_id, input).await
    }

    // ---- services ----

    #[instrument(skip(self, input), fields(category_id = %category_id))]
    pub async fn create_service(&self, category_id: Uuid, input: NewService) -> Result<Service, TaxonomyError> {
        let translations = Translations::from_entries(input.translations)?;
        let scope_key = Scope::Category(category_id);
        let version = self.store.version(scope_key).await?;
        if self.store.category(category_id).await?.is_none() {
            return Err(TaxonomyError::not_found("category", category_id));
        }
        let services = self.store.services(&[category_id]).await?;
        let now = Utc::now();
        let mut scope = OrderedScope::compact(&services);
        let mut created = Service { id: Uuid::new_v4(), category_id, order: 0, translations, created_at: now, updated_at: now };
        created.order = scope.insert(created.id, input.order_in_category);
        let mut changes = ChangeSet::new();
        changes.expect(scope_key, version);
        changes.put_moved(scope.apply(services), now);
        changes.push(Write::PutService(created.clone()));
        self.store.commit(changes).await?;
        info!(service_id = %created.id, category_id = %category_id, order = created.order, "service_created");
        Ok(created)
    }

    #[instrument(skip(self, input), fields(service_id = %id))]
    pub async fn replace_service(&self, id: Uuid, input: ServiceReplace) -> Result<Service, TaxonomyError> {
        let translations = Translations::from_entries(input.translations)?;
        let existing = self.store.service(id).await?.ok_or_else(|| TaxonomyError::not_found("service", id))?;
        let scope_key = Scope::Category(existing.category_id);
        let version = self.store.version(scope_key).await?;
        let mut service = self.store.service(id).await?.ok_or_else(|| TaxonomyError::not_found("service", id))?;
        service.translations = translations;
        service.updated_at = Utc::now();
        let mut changes = ChangeSet::new();
        changes.expect(scope_key, version).push(Write::PutService(service.clone()));
        self.store.commit(changes).await?;
        info!(service_id = %id, "service_replaced");
        Ok(service)
    }

    #[instrument(skip(self), fields(service_id = %id))]
    pub async fn delete_service(&self, id: Uuid) -> Result<(), TaxonomyError> {
        let existing = self.store.service(id).await?.ok_or_else(|| TaxonomyError::not_found("service", id))?;
        let scope_key = Scope::Category(existing.category_id);
        let version = self.store.version(scope_key).await?;
        let services = self.store.services(&[existing.category_id]).await?;
        if !services.iter().any(|s| s.id == id) {
            return Err(TaxonomyError::not_found("service", id));
        }
        let mut scope = OrderedScope::compact(&services);
        scope.remove(id);
        let mut changes = ChangeSet::new();
        changes.expect(scope_key, version).push(Write::DeleteService(id)).put_moved(scope.apply(services), Utc::now());
        self.store.commit(changes).await?;
        info!(service_id = %id, category_id = %existing.category_id, "service_deleted");
        Ok(())
    }

    #[instrument(skip(self, ordered_ids), fields(category_id = %category_id, count = ordered_ids.len()))]
    pub async fn reorder_services(
        &self,
        category_id: Uuid,
        ordered_ids: &[Uuid],
        expected_version: Option<u64>,
    ) -> Result<Vec<Service>, TaxonomyError> {
        let scope_key = Scope::Category(category_id);
        let version = self.store.version(scope_key).await?;
        ensure_version(scope_key, version, expected_version)?;
        if self.store.category(category_id).await?.is_none() {
            return Err(TaxonomyError::not_found("category", category_id));
        }
        let services = self.store.services(&[category_id]).await?;
        let mut scope = OrderedScope::compact(&services);
        scope.reorder(ordered_ids)?;
        let applied = scope.apply(services);
        let result: Vec<Service> = applied.iter().map(|(s, _)| s.clone()).collect();
        let mut changes = ChangeSet::new();
        changes.expect(scope_key, version).put_moved(applied, Utc::now());
        self.store.commit(changes).await?;
        info!(category_id = %category_id, count = result.len(), "services_reordered");
        Ok(result)
    }

    pub async fn sync_services(&self, category_id: Uuid, input: ServiceBulkSync) -> Result<Vec<Service>, TaxonomyError> {
        self.bulk.sync_services(category_id, input).await
    }

    // ---- reads ----

    pub async fn tree(&self, locale: Option<&str>) -> Result<TaxonomyTree, TaxonomyError> {
        self.query.active_tree(locale).await
    }

    pub async fn unassigned(&self, locale: Option<&str>) -> Result<Vec<Labeled<Category>>, TaxonomyError> {
        self.query.unassigned(locale).await
    }

    pub async fn soft_deleted(&self, locale: Option<&str>) -> Result<Vec<Labeled<Category>>, TaxonomyError> {
        self.query.soft_deleted(locale).await
    }

    pub async fn cluster(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Cluster>, TaxonomyError> {
        self.query.cluster(id, locale).await
    }

    pub async fn category(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Category>, TaxonomyError> {
        self.query.category(id, locale).await
    }

    pub async fn service(&self, id: Uuid, locale: Option<&str>) -> Result<Labeled<Service>, TaxonomyError> {
        self.query.service(id, locale).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{en, interleaved_services, memory_service, new_cluster, seed_categories, Interleave};

    fn orders(clusters: &[Cluster]) -> Vec<u32> { clusters.iter().map(|c| c.order).collect() }

    #[tokio::test]
    async fn cluster_orders_stay_dense() {
        let svc = memory_service();
        let a = svc.create_cluster(new_cluster("A")).await.unwrap();
        let b = svc.create_cluster(new_cluster("B")).await.unwrap();
        let c = svc.create_cluster(new_cluster("C")).await.unwrap();
        assert_eq!(orders(&svc.store().clusters().await.unwrap()), vec![0, 1, 2]);

        let reordered = svc.reorder_clusters(&[b.id, a.id, c.id], None).await.unwrap();
        assert_eq!(reordered.iter().map(|x| (x.id, x.order)).collect::<Vec<_>>(), vec![(b.id, 0), (a.id, 1), (c.id, 2)]);

        svc.delete_cluster(a.id).await.unwrap();
        let left = svc.store().clusters().await.unwrap();
        assert_eq!(left.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b.id, c.id]);
        assert_eq!(orders(&left), vec![0, 1]);

        svc.create_cluster(new_cluster("D")).await.unwrap();
        assert_eq!(orders(&svc.store().clusters().await.unwrap()), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn reorder_rejects_partial_lists_and_stale_versions() {
        let svc = memory_service();
        let a = svc.create_cluster(new_cluster("A")).await.unwrap();
        let b = svc.create_cluster(new_cluster("B")).await.unwrap();
        let err = svc.reorder_clusters(&[a.id], None).await.unwrap_err();
        assert!(matches!(err, TaxonomyError::OrderConflict(_)));

        let version = svc.store().version(Scope::Clusters).await.unwrap();
        let stale = svc.reorder_clusters(&[b.id, a.id], Some(version - 1)).await.unwrap_err();
        assert!(matches!(stale, TaxonomyError::OrderConflict(_)));
        assert_eq!(svc.store().clusters().await.unwrap()[0].id, a.id);
        svc.reorder_clusters(&[b.id, a.id], Some(version)).await.unwrap();
        assert_eq!(svc.store().version(Scope::Clusters).await.unwrap(), version + 1);
    }

    #[tokio::test]
    async fn delete_cluster_orphans_categories() {
        let svc = memory_service();
        let tech = svc.create_cluster(new_cluster("Tech")).await.unwrap();
        let cats = seed_categories(&svc, tech.id, &["Frontend", "Backend"]).await;
        svc.soft_delete_category(cats[1].id).await.unwrap();

        svc.delete_cluster(tech.id).await.unwrap();
        let orphan = svc.store().category(cats[0].id).await.unwrap().unwrap();
        assert_eq!(orphan.placement, Placement::Unassigned);
        let deleted = svc.store().category(cats[1].id).await.unwrap().unwrap();
        assert_eq!(deleted.placement, Placement::Deleted { former_cluster_id: None });
        assert!(matches!(svc.delete_cluster(tech.id).await, Err(TaxonomyError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_cluster_conflicts_with_concurrent_restore() {
        let (svc, store, direct) = interleaved_services(Interleave::BeforeCommit);
        let tech = direct.create_cluster(new_cluster("Tech")).await.unwrap();
        let cat = seed_categories(&direct, tech.id, &["Frontend"]).await.remove(0);
        direct.soft_delete_category(cat.id).await.unwrap();

        let racer = direct.clone();
        store.arm(async move { racer.restore_category(cat.id).await.expect("restore"); }).await;
        let err = svc.delete_cluster(tech.id).await.unwrap_err();
        assert!(matches!(err, TaxonomyError::OrderConflict(_)));
        assert_eq!(direct.store().category(cat.id).await.unwrap().unwrap().placement, Placement::Unassigned);
        assert!(direct.store().cluster(tech.id).await.unwrap().is_some());

        svc.delete_cluster(tech.id).await.unwrap();
        assert!(direct.store().cluster(tech.id).await.unwrap().is_none());
        assert_eq!(direct.store().category(cat.id).await.unwrap().unwrap().placement, Placement::Unassigned);
    }

    #[tokio::test]
    async fn create_category_inserts_at_requested_order() {
        let svc = memory_service();
        let tech = svc.create_cluster(new_cluster("Tech")).await.unwrap();
        let cats = seed_categories(&svc, tech.id, &["x", "y"]).await;
        let first = svc
            .create_category(NewCategory { icon: "i".into(), order_in_cluster: Some(0), cluster_id: Some(tech.id), translations: en("w") })
            .await
            .unwrap();
        assert_eq!(first.placement, Placement::Active { cluster_id: tech.id, order: 0 });
        let members = svc.store().categories(CategoryFilter::InCluster(tech.id)).await.unwrap();
        assert_eq!(members.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first.id, cats[0].id, cats[1].id]);

        let err = svc
            .create_category(NewCategory { icon: String::new(), order_in_cluster: None, cluster_id: Some(Uuid::new_v4()), translations: en("z") })
            .await
            .unwrap_err();
        assert!(matches!(err, TaxonomyError::NotFound(_)));
        let err = svc
            .create_category(NewCategory { icon: String::new(), order_in_cluster: None, cluster_id: None, translations: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, TaxonomyError::Validation(_)));
    }

    #[tokio::test]
    async fn reorder_categories_in_cluster() {
        let svc = memory_service();
        let tech = svc.create_cluster(new_cluster("Tech")).await.unwrap();
        let cats = seed_categories(&svc, tech.id, &["a", "b", "c"]).await;
        let out = svc.reorder_categories(tech.id, &[cats[1].id, cats[0].id, cats[2].id], None).await.unwrap();
        assert_eq!(
            out.iter().map(|c| (c.id, c.placement.columns().order_in_cluster)).collect::<Vec<_>>(),
            vec![(cats[1].id, Some(0)), (cats[0].id, Some(1)), (cats[2].id, Some(2))]
        );
    }

    #[tokio::test]
    async fn replace_keeps_placement() {
        let svc = memory_service();
        let tech = svc.create_cluster(new_cluster("Tech")).await.unwrap();
        let cat = seed_categories(&svc, tech.id, &["a"]).await.remove(0);
        let replaced = svc.replace_category(cat.id, CategoryReplace { icon: "new".into(), translations: en("A") }).await.unwrap();
        assert_eq!(replaced.placement, cat.placement);
        assert_eq!(replaced.icon, "new");

        let cluster = svc
            .replace_cluster(tech.id, ClusterReplace { icon: "c".into(), is_active: false, translations: en("Technology") })
            .await
            .unwrap();
        assert!(!cluster.is_active);
        assert_eq!(cluster.order, 0);
    }

    #[tokio::test]
    async fn service_crud_keeps_orders_dense() {
        let svc = memory_service();
        let tech = svc.create_cluster(new_cluster("Tech")).await.unwrap();
        let cat = seed_categories(&svc, tech.id, &["Backend"]).await.remove(0);
        let s0 = svc.create_service(cat.id, NewService { order_in_category: None, translations: en("Rust") }).await.unwrap();
        let s1 = svc.create_service(cat.id, NewService { order_in_category: None, translations: en("Go") }).await.unwrap();
        let s2 = svc.create_service(cat.id, NewService { order_in_category: Some(0), translations: en("Zig") }).await.unwrap();
        let ids = |v: Vec<Service>| v.into_iter().map(|s| (s.id, s.order)).collect::<Vec<_>>();
        assert_eq!(ids(svc.store().services(&[cat.id]).await.unwrap()), vec![(s2.id, 0), (s0.id, 1), (s1.id, 2)]);

        svc.delete_service(s0.id).await.unwrap();
        assert_eq!(ids(svc.store().services(&[cat.id]).await.unwrap()), vec![(s2.id, 0), (s1.id, 1)]);

        let renamed = svc.replace_service(s1.id, ServiceReplace { translations: en("Golang") }).await.unwrap();
        assert_eq!(renamed.order, 1);
        let out = svc.reorder_services(cat.id, &[s1.id, s2.id], None).await.unwrap();
        assert_eq!(ids(out), vec![(s1.id, 0), (s2.id, 1)]);

        let missing = svc.create_service(Uuid::new_v4(), NewService { order_in_category: None, translations: en("x") }).await;
        assert!(matches!(missing, Err(TaxonomyError::NotFound(_))));
    }
}
