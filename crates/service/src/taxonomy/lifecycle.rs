use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::domain::{Category, Placement, Reassign, Scope};
use super::ordering::OrderedScope;
use super::repository::{CategoryFilter, ChangeSet, TaxonomyStore, Write};

/// Scopes a category operation must hold: its own plus its active cluster.
fn category_scopes(category: &Category) -> Vec<Scope> {
    let mut scopes = vec![Scope::Category(category.id)];
    if let Some(cluster_id) = category.placement.active_cluster() {
        scopes.push(Scope::Cluster(cluster_id));
    }
    scopes
}

/// Load a category together with the versions guarding it.
///
/// Versions are read between two loads; if the category changed scope in
/// between, the call fails with `OrderConflict` instead of guessing.
pub(crate) async fn guarded_category<S>(
    store: &S,
    id: Uuid,
    extra: &[Scope],
) -> Result<(Category, HashMap<Scope, u64>), TaxonomyError>
where
    S: TaxonomyStore + ?Sized,
{
    let first = store.category(id).await?.ok_or_else(|| TaxonomyError::not_found("category", id))?;
    let mut scopes = category_scopes(&first);
    scopes.extend_from_slice(extra);
    let versions = store.versions(&scopes).await?;
    let current = store.category(id).await?.ok_or_else(|| TaxonomyError::not_found("category", id))?;
    if current.placement.active_cluster() != first.placement.active_cluster() {
        return Err(TaxonomyError::OrderConflict(format!("category {} moved concurrently", id)));
    }
    Ok((current, versions))
}

/// Soft-delete, restore and cross-cluster moves of categories.
pub struct LifecycleManager<S: TaxonomyStore + ?Sized> {
    store: Arc<S>,
}

impl<S: TaxonomyStore + ?Sized> LifecycleManager<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Mark a category deleted and close the gap it leaves in its cluster.
    /// Deleting an already-deleted category returns it unchanged.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn soft_delete(&self, id: Uuid) -> Result<Category, TaxonomyError> {
        let (mut category, versions) = guarded_category(&*self.store, id, &[]).await?;
        if category.placement.is_deleted() {
            return Ok(category);
        }
        let now = Utc::now();
        let former = category.placement.active_cluster();
        let mut changes = ChangeSet::new();
        changes.expect_all(&versions);
        if let Some(cluster_id) = former {
            let siblings = self.store.categories(CategoryFilter::InCluster(cluster_id)).await?;
            let mut scope = OrderedScope::compact(&siblings);
            scope.remove(id);
            changes.put_moved(scope.apply(siblings), now);
        }
        category.placement = Placement::Deleted { former_cluster_id: former };
        category.updated_at = now;
        changes.push(Write::PutCategory(category.clone()));
        self.store.commit(changes).await?;
        info!(category_id = %id, former_cluster_id = ?former, "category_soft_deleted");
        Ok(category)
    }

    /// Bring a deleted category back into the unassigned pool.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn restore(&self, id: Uuid) -> Result<Category, TaxonomyError> {
        let (mut category, versions) = guarded_category(&*self.store, id, &[]).await?;
        if !category.placement.is_deleted() {
            return Err(TaxonomyError::Validation(format!("category {} is not deleted", id)));
        }
        category.placement = Placement::Unassigned;
        category.updated_at = Utc::now();
        let mut changes = ChangeSet::new();
        changes.expect_all(&versions).push(Write::PutCategory(category.clone()));
        self.store.commit(changes).await?;
        info!(category_id = %id, "category_restored");
        Ok(category)
    }

    /// Move a category to another cluster (or to the unassigned pool).
    #[instrument(skip(self, input), fields(category_id = %id, new_cluster_id = ?input.new_cluster_id))]
    pub async fn reassign(&self, id: Uuid, input: Reassign) -> Result<Category, TaxonomyError> {
        let target = input.new_cluster_id;
        if target.is_none() && input.order_in_cluster.is_some() {
            return Err(TaxonomyError::Validation("orderInCluster requires newClusterId".into()));
        }
        let extra: Vec<Scope> = target.map(Scope::Cluster).into_iter().collect();
        let (mut category, versions) = guarded_category(&*self.store, id, &extra).await?;
        if category.placement.is_deleted() {
            return Err(TaxonomyError::Validation(format!("category {} is deleted; restore it first", id)));
        }
        if let Some(cluster_id) = target {
            if self.store.cluster(cluster_id).await?.is_none() {
                return Err(TaxonomyError::not_found("cluster", cluster_id));
            }
        }

        let now = Utc::now();
        let source = category.placement.active_cluster();
        let mut changes = ChangeSet::new();
        changes.expect_all(&versions);

        if let Some(from) = source.filter(|from| Some(*from) != target) {
            let siblings: Vec<Category> = self
                .store
                .categories(CategoryFilter::InCluster(from))
                .await?
                .into_iter()
                .filter(|c| c.id != id)
                .collect();
            let scope = OrderedScope::compact(&siblings);
            changes.put_moved(scope.apply(siblings), now);
        }

        match target {
            Some(to) => {
                let mut members: Vec<Category> = self
                    .store
                    .categories(CategoryFilter::InCluster(to))
                    .await?
                    .into_iter()
                    .filter(|c| c.id != id)
                    .collect();
                let mut scope = OrderedScope::compact(&members);
                let position = scope.insert(id, input.order_in_cluster);
                category.placement = Placement::Active { cluster_id: to, order: position };
                category.updated_at = now;
                members.push(category.clone());
                for (member, changed) in scope.apply(members) {
                    if member.id == id {
                        category = member;
                    } else if changed {
                        let mut member = member;
                        member.updated_at = now;
                        changes.push(Write::PutCategory(member));
                    }
                }
            }
            None => {
                category.placement = Placement::Unassigned;
                category.updated_at = now;
            }
        }
        changes.push(Write::PutCategory(category.clone()));
        self.store.commit(changes).await?;
        info!(category_id = %id, from = ?source, to = ?target, placement = ?category.placement, "category_reassigned");
        Ok(category)
    }
}
