use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::TaxonomyError;
use crate::taxonomy::domain::{Category, Cluster, Placement, Scope, Service};
use crate::taxonomy::repository::{CategoryFilter, ChangeSet, TaxonomyStore, Write};

#[derive(Default)]
struct State {
    clusters: HashMap<Uuid, Cluster>,
    categories: HashMap<Uuid, Category>,
    services: HashMap<Uuid, Service>,
    versions: HashMap<Scope, u64>,
}

/// Process-local store; a commit runs entirely under one write lock.
#[derive(Default)]
pub struct MemoryTaxonomyStore {
    state: RwLock<State>,
}

impl MemoryTaxonomyStore {
    pub fn new() -> Self { Self::default() }
}

fn sort_by_creation(categories: &mut [Category]) {
    categories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[async_trait]
impl TaxonomyStore for MemoryTaxonomyStore {
    async fn versions(&self, scopes: &[Scope]) -> Result<HashMap<Scope, u64>, TaxonomyError> {
        let state = self.state.read().await;
        Ok(scopes.iter().map(|s| (*s, state.versions.get(s).copied().unwrap_or(0))).collect())
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, TaxonomyError> {
        let state = self.state.read().await;
        let mut out: Vec<Cluster> = state.clusters.values().cloned().collect();
        out.sort_by_key(|c| (c.order, c.created_at, c.id));
        Ok(out)
    }

    async fn cluster(&self, id: Uuid) -> Result<Option<Cluster>, TaxonomyError> {
        Ok(self.state.read().await.clusters.get(&id).cloned())
    }

    async fn categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, TaxonomyError> {
        let state = self.state.read().await;
        let all = state.categories.values();
        let mut out: Vec<Category> = match filter {
            CategoryFilter::All => all.cloned().collect(),
            CategoryFilter::Active => all.filter(|c| c.placement.active_cluster().is_some()).cloned().collect(),
            CategoryFilter::InCluster(cluster_id) => {
                all.filter(|c| c.placement.active_cluster() == Some(cluster_id)).cloned().collect()
            }
            CategoryFilter::Unassigned => all.filter(|c| c.placement.is_unassigned()).cloned().collect(),
            CategoryFilter::Deleted => all.filter(|c| c.placement.is_deleted()).cloned().collect(),
        };
        match filter {
            CategoryFilter::Active | CategoryFilter::InCluster(_) => out.sort_by_key(|c| match c.placement {
                Placement::Active { cluster_id, order } => (cluster_id, order, c.id),
                _ => (Uuid::nil(), u32::MAX, c.id),
            }),
            _ => sort_by_creation(&mut out),
        }
        Ok(out)
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, TaxonomyError> {
        Ok(self.state.read().await.categories.get(&id).cloned())
    }

    async fn services(&self, category_ids: &[Uuid]) -> Result<Vec<Service>, TaxonomyError> {
        let state = self.state.read().await;
        let mut out: Vec<Service> =
            state.services.values().filter(|s| category_ids.contains(&s.category_id)).cloned().collect();
        out.sort_by_key(|s| (s.category_id, s.order, s.id));
        Ok(out)
    }

    async fn service(&self, id: Uuid) -> Result<Option<Service>, TaxonomyError> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), TaxonomyError> {
        let mut state = self.state.write().await;
        let (expected, writes) = changes.into_parts();
        for (scope, version) in &expected {
            let current = state.versions.get(scope).copied().unwrap_or(0);
            if current != *version {
                return Err(TaxonomyError::OrderConflict(format!(
                    "scope {} changed concurrently (expected version {}, found {})",
                    scope, version, current
                )));
            }
        }
        // Referential checks run before anything is applied so a failure leaves no trace.
        for write in &writes {
            if let Write::PutService(s) = write {
                let pending = writes.iter().any(|w| matches!(w, Write::PutCategory(c) if c.id == s.category_id));
                if !pending && !state.categories.contains_key(&s.category_id) {
                    return Err(TaxonomyError::Store(format!("category {} does not exist", s.category_id)));
                }
            }
        }
        for write in writes {
            match write {
                Write::PutCluster(c) => {
                    state.clusters.insert(c.id, c);
                }
                Write::DeleteCluster(id) => {
                    state.clusters.remove(&id);
                }
                Write::PutCategory(c) => {
                    state.categories.insert(c.id, c);
                }
                Write::PutService(s) => {
                    state.services.insert(s.id, s);
                }
                Write::DeleteService(id) => {
                    state.services.remove(&id);
                }
            }
        }
        for scope in expected.into_keys() {
            *state.versions.entry(scope).or_insert(0) += 1;
        }
        Ok(())
    }
}
