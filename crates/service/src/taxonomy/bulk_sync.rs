//! Reconcile a submitted child collection against the stored one.
//!
//! Input is validated in a fixed order before anything is computed:
//! ids foreign to the parent (`ScopeMismatch`), then ids listed twice or in
//! both lists (`Validation`), then translations (`Validation`). The result is
//! a single change set, so a failing sync never leaves a partial state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::domain::{
    Category, CategoryBulkSync, CategoryUpsert, Placement, Scope, Service, ServiceBulkSync, ServiceUpsert, Translations,
};
use super::ordering::{OrderedScope, Slot};
use super::repository::{ensure_version, CategoryFilter, ChangeSet, TaxonomyStore, Write};

/// Explicit set view of one sync request.
#[derive(Debug, Default)]
struct Reconciliation {
    updated: HashSet<Uuid>,
    removed: Vec<Uuid>,
}

impl Reconciliation {
    fn plan(
        parent: &str,
        members: &HashSet<Uuid>,
        upsert_ids: &[Uuid],
        remove_ids: &[Uuid],
    ) -> Result<Self, TaxonomyError> {
        if let Some(foreign) = upsert_ids.iter().chain(remove_ids).find(|id| !members.contains(id)) {
            return Err(TaxonomyError::ScopeMismatch(format!("{} does not belong to {}", foreign, parent)));
        }
        let mut updated = HashSet::with_capacity(upsert_ids.len());
        for id in upsert_ids {
            if !updated.insert(*id) {
                return Err(TaxonomyError::Validation(format!("{} is listed more than once", id)));
            }
        }
        let mut removed_set = HashSet::with_capacity(remove_ids.len());
        for id in remove_ids {
            if updated.contains(id) {
                return Err(TaxonomyError::Validation(format!("{} is both updated and removed", id)));
            }
            if !removed_set.insert(*id) {
                return Err(TaxonomyError::Validation(format!("{} is removed more than once", id)));
            }
        }
        Ok(Self { updated, removed: remove_ids.to_vec() })
    }

    fn is_removed(&self, id: &Uuid) -> bool { self.removed.contains(id) }
}

fn slot(requested: Option<u32>, current: Option<u32>) -> Slot {
    match (requested, current) {
        (Some(o), _) => Slot::Requested(o),
        (None, Some(o)) => Slot::Current(o),
        (None, None) => Slot::Append,
    }
}

pub struct BulkSyncProcessor<S: TaxonomyStore + ?Sized> {
    store: Arc<S>,
}

impl<S: TaxonomyStore + ?Sized> BulkSyncProcessor<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Replace the active categories of a cluster. Removed categories are
    /// soft-deleted; the active list is returned in its new order.
    #[instrument(skip(self, input), fields(cluster_id = %cluster_id, upserts = input.categories.len(), removals = input.remove_category_ids.len()))]
    pub async fn sync_categories(&self, cluster_id: Uuid, input: CategoryBulkSync) -> Result<Vec<Category>, TaxonomyError> {
        let scope = Scope::Cluster(cluster_id);
        let version = self.store.version(scope).await?;
        if let Err(e) = ensure_version(scope, version, input.expected_version) {
            warn!(%scope, current = version, "stale bulk sync rejected");
            return Err(e);
        }
        if self.store.cluster(cluster_id).await?.is_none() {
            return Err(TaxonomyError::not_found("cluster", cluster_id));
        }
        let stored = self.store.categories(CategoryFilter::InCluster(cluster_id)).await?;
        let members: HashSet<Uuid> = stored.iter().map(|c| c.id).collect();
        let upsert_ids: Vec<Uuid> = input.categories.iter().filter_map(|u| u.id).collect();
        let plan = Reconciliation::plan(&format!("cluster {}", cluster_id), &members, &upsert_ids, &input.remove_category_ids)?;

        let mut prepared: Vec<(CategoryUpsert, Translations)> = Vec::with_capacity(input.categories.len());
        for upsert in input.categories {
            let translations = Translations::from_entries(upsert.translations.clone())?;
            if let Some(icon) = &upsert.icon {
                models::validate::validate_icon(icon)?;
            }
            prepared.push((upsert, translations));
        }

        let now = Utc::now();
        let mut by_id: HashMap<Uuid, Category> = stored.into_iter().map(|c| (c.id, c)).collect();
        let mut changes = ChangeSet::new();
        changes.expect(scope, version);

        for id in &plan.removed {
            if let Some(mut category) = by_id.remove(id) {
                category.placement = Placement::Deleted { former_cluster_id: Some(cluster_id) };
                category.updated_at = now;
                changes.push(Write::PutCategory(category));
            }
        }

        let mut slots: Vec<(Uuid, Slot)> = Vec::new();
        let mut touched: HashSet<Uuid> = HashSet::new();
        let mut survivors: Vec<Category> = Vec::new();
        let mut created = 0usize;
        for (upsert, translations) in prepared {
            match upsert.id {
                Some(id) => {
                    if let Some(mut category) = by_id.remove(&id) {
                        let current = category.placement.columns().order_in_cluster;
                        if let Some(icon) = upsert.icon {
                            category.icon = icon;
                        }
                        category.translations = translations;
                        category.updated_at = now;
                        slots.push((id, slot(upsert.order_in_cluster, current)));
                        touched.insert(id);
                        survivors.push(category);
                    }
                }
                None => {
                    let id = Uuid::new_v4();
                    survivors.push(Category {
                        id,
                        icon: upsert.icon.unwrap_or_default(),
                        placement: Placement::Active { cluster_id, order: u32::MAX },
                        translations,
                        created_at: now,
                        updated_at: now,
                    });
                    slots.push((id, slot(upsert.order_in_cluster, None)));
                    touched.insert(id);
                    created += 1;
                }
            }
        }
        // Members neither updated nor removed keep their current slot.
        for (id, category) in by_id {
            debug_assert!(!plan.updated.contains(&id) && !plan.is_removed(&id));
            slots.push((id, slot(None, category.placement.columns().order_in_cluster)));
            survivors.push(category);
        }

        let ordered = OrderedScope::arrange(slots);
        let mut result = Vec::with_capacity(ordered.len());
        for (mut category, moved) in ordered.apply(survivors) {
            if moved || touched.contains(&category.id) {
                category.updated_at = now;
                changes.push(Write::PutCategory(category.clone()));
            }
            result.push(category);
        }

        self.store.commit(changes).await?;
        info!(
            cluster_id = %cluster_id,
            created,
            updated = plan.updated.len(),
            removed = plan.removed.len(),
            "categories_synced"
        );
        Ok(result)
    }

    /// Replace the services of a category. Removed services are deleted for good.
    #[instrument(skip(self, input), fields(category_id = %category_id, upserts = input.services.len(), removals = input.delete_service_ids.len()))]
    pub async fn sync_services(&self, category_id: Uuid, input: ServiceBulkSync) -> Result<Vec<Service>, TaxonomyError> {
        let scope = Scope::Category(category_id);
        let version = self.store.version(scope).await?;
        if let Err(e) = ensure_version(scope, version, input.expected_version) {
            warn!(%scope, current = version, "stale bulk sync rejected");
            return Err(e);
        }
        if self.store.category(category_id).await?.is_none() {
            return Err(TaxonomyError::not_found("category", category_id));
        }
        let stored = self.store.services(&[category_id]).await?;
        let members: HashSet<Uuid> = stored.iter().map(|s| s.id).collect();
        let upsert_ids: Vec<Uuid> = input.services.iter().filter_map(|u| u.id).collect();
        let plan = Reconciliation::plan(&format!("category {}", category_id), &members, &upsert_ids, &input.delete_service_ids)?;

        let mut prepared: Vec<(ServiceUpsert, Translations)> = Vec::with_capacity(input.services.len());
        for upsert in input.services {
            let translations = Translations::from_entries(upsert.translations.clone())?;
            prepared.push((upsert, translations));
        }

        let now = Utc::now();
        let mut by_id: HashMap<Uuid, Service> = stored.into_iter().map(|s| (s.id, s)).collect();
        let mut changes = ChangeSet::new();
        changes.expect(scope, version);

        for id in &plan.removed {
            by_id.remove(id);
            changes.push(Write::DeleteService(*id));
        }

        let mut slots: Vec<(Uuid, Slot)> = Vec::new();
        let mut touched: HashSet<Uuid> = HashSet::new();
        let mut survivors: Vec<Service> = Vec::new();
        let mut created = 0usize;
        for (upsert, translations) in prepared {
            match upsert.id {
                Some(id) => {
                    if let Some(mut service) = by_id.remove(&id) {
                        service.translations = translations;
                        service.updated_at = now;
                        slots.push((id, slot(upsert.order_in_category, Some(service.order))));
                        touched.insert(id);
                        survivors.push(service);
                    }
                }
                None => {
                    let id = Uuid::new_v4();
                    survivors.push(Service {
                        id,
                        category_id,
                        order: u32::MAX,
                        translations,
                        created_at: now,
                        updated_at: now,
                    });
                    slots.push((id, slot(upsert.order_in_category, None)));
                    touched.insert(id);
                    created += 1;
                }
            }
        }
        for (id, service) in by_id {
            slots.push((id, Slot::Current(service.order)));
            survivors.push(service);
        }

        let ordered = OrderedScope::arrange(slots);
        let mut result = Vec::with_capacity(ordered.len());
        for (mut service, moved) in ordered.apply(survivors) {
            if moved || touched.contains(&service.id) {
                service.updated_at = now;
                changes.push(Write::PutService(service.clone()));
            }
            result.push(service);
        }

        self.store.commit(changes).await?;
        info!(
            category_id = %category_id,
            created,
            updated = plan.updated.len(),
            deleted = plan.removed.len(),
            "services_synced"
        );
        Ok(result)
    }
}
