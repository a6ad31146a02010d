#![cfg(test)]
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};
use sea_orm::DatabaseConnection;
use migration::MigratorTrait;
use models::db::{connect_with_config, DatabaseConfig};
use uuid::Uuid;

use crate::errors::TaxonomyError;
use crate::taxonomy::domain::{Category, Cluster, NewCategory, NewCluster, Scope, Service, TranslationEntry};
use crate::taxonomy::repo::MemoryTaxonomyStore;
use crate::taxonomy::repository::{CategoryFilter, ChangeSet, TaxonomyStore};
use crate::taxonomy::{TaxonomyService, TranslationResolver};

// Migrations run once per test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// DB-backed tests are skipped when asked to, or when no database is configured.
pub fn skip_db_tests() -> bool {
    let _ = dotenvy::dotenv();
    std::env::var("SKIP_DB_TESTS").is_ok() || std::env::var("DATABASE_URL").is_err()
}

pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    MIGRATED
        .get_or_init(|| async {
            let cfg = DatabaseConfig::from_env();
            let db = connect_with_config(&cfg).await.expect("connect db for migration");
            migration::Migrator::up(&db, None).await.expect("migrate up");
        })
        .await;

    let mut cfg = DatabaseConfig::from_env();
    cfg.max_connections = cfg.max_connections.max(5);
    cfg.min_connections = cfg.min_connections.min(1);
    cfg.acquire_timeout = std::time::Duration::from_secs(10);
    Ok(connect_with_config(&cfg).await?)
}

pub fn memory_service() -> TaxonomyService<MemoryTaxonomyStore> {
    TaxonomyService::new(Arc::new(MemoryTaxonomyStore::new()), TranslationResolver::default())
}

pub fn en(name: &str) -> Vec<TranslationEntry> {
    vec![TranslationEntry { language_code: "en".into(), name: name.into(), description: None }]
}

pub fn new_cluster(name: &str) -> NewCluster {
    NewCluster { icon: format!("{}-icon", name.to_lowercase()), is_active: true, translations: en(name) }
}

/// Append one category per name to `cluster_id`, in order.
pub async fn seed_categories(svc: &TaxonomyService<MemoryTaxonomyStore>, cluster_id: Uuid, names: &[&str]) -> Vec<Category> {
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let input = NewCategory {
            icon: format!("{}-icon", name.to_lowercase()),
            order_in_cluster: None,
            cluster_id: Some(cluster_id),
            translations: en(name),
        };
        out.push(svc.create_category(input).await.expect("seed category"));
    }
    out
}

/// Where an [`InterleavedStore`] runs its armed write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interleave {
    BeforeCommit,
    OnServicesRead,
}

type Pending = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Memory store that runs one armed write at a chosen point of the next
/// operation, standing in for a concurrent request.
pub struct InterleavedStore {
    inner: Arc<MemoryTaxonomyStore>,
    at: Interleave,
    pending: Mutex<Option<Pending>>,
}

impl InterleavedStore {
    pub async fn arm(&self, write: impl Future<Output = ()> + Send + 'static) {
        *self.pending.lock().await = Some(Box::pin(write));
    }

    async fn fire(&self, point: Interleave) {
        if self.at != point {
            return;
        }
        let pending = self.pending.lock().await.take();
        if let Some(write) = pending {
            write.await;
        }
    }
}

#[async_trait]
impl TaxonomyStore for InterleavedStore {
    async fn versions(&self, scopes: &[Scope]) -> Result<HashMap<Scope, u64>, TaxonomyError> {
        self.inner.versions(scopes).await
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, TaxonomyError> { self.inner.clusters().await }

    async fn cluster(&self, id: Uuid) -> Result<Option<Cluster>, TaxonomyError> { self.inner.cluster(id).await }

    async fn categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, TaxonomyError> {
        self.inner.categories(filter).await
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, TaxonomyError> { self.inner.category(id).await }

    async fn services(&self, category_ids: &[Uuid]) -> Result<Vec<Service>, TaxonomyError> {
        self.fire(Interleave::OnServicesRead).await;
        self.inner.services(category_ids).await
    }

    async fn service(&self, id: Uuid) -> Result<Option<Service>, TaxonomyError> { self.inner.service(id).await }

    async fn commit(&self, changes: ChangeSet) -> Result<(), TaxonomyError> {
        self.fire(Interleave::BeforeCommit).await;
        self.inner.commit(changes).await
    }
}

/// A service over an [`InterleavedStore`], the store itself for arming, and
/// a plain service over the same data for setup and racing writes.
pub fn interleaved_services(
    at: Interleave,
) -> (TaxonomyService<InterleavedStore>, Arc<InterleavedStore>, Arc<TaxonomyService<MemoryTaxonomyStore>>) {
    let inner = Arc::new(MemoryTaxonomyStore::new());
    let store = Arc::new(InterleavedStore { inner: inner.clone(), at, pending: Mutex::new(None) });
    let direct = Arc::new(TaxonomyService::new(inner, TranslationResolver::default()));
    (TaxonomyService::new(store.clone(), TranslationResolver::default()), store, direct)
}
