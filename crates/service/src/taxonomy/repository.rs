use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::TaxonomyError;

use super::domain::{Category, Cluster, Scope, Service, Timestamped};
use super::ordering::Positioned;

/// One record-level write of a [`ChangeSet`]; puts are full-record upserts.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    PutCluster(Cluster),
    DeleteCluster(Uuid),
    PutCategory(Category),
    PutService(Service),
    DeleteService(Uuid),
}

/// Writes guarded by the scope versions they were computed from.
///
/// Every scope listed in `expected` is checked before any write is applied
/// and bumped by one when the set commits. Writes apply in insertion order.
///
/// Guards: cluster records under `Clusters`; an active category under its
/// cluster's scope; any category being the subject of an operation under
/// its own `Category` scope, which also guards its services.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    expected: BTreeMap<Scope, u64>,
    writes: Vec<Write>,
}

impl ChangeSet {
    pub fn new() -> Self { Self::default() }

    pub fn expect(&mut self, scope: Scope, version: u64) -> &mut Self {
        self.expected.insert(scope, version);
        self
    }

    /// Expect every scope in `versions` at the version read.
    pub fn expect_all(&mut self, versions: &HashMap<Scope, u64>) -> &mut Self {
        for (scope, version) in versions {
            self.expected.insert(*scope, *version);
        }
        self
    }

    pub fn push(&mut self, write: Write) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Stage the members whose position moved, stamping them with `now`.
    pub fn put_moved<T>(&mut self, applied: Vec<(T, bool)>, now: DateTime<Utc>) -> &mut Self
    where
        T: Positioned + Timestamped + Into<Write>,
    {
        for (mut member, changed) in applied {
            if changed {
                member.touch(now);
                self.writes.push(member.into());
            }
        }
        self
    }

    pub fn expected(&self) -> &BTreeMap<Scope, u64> { &self.expected }

    pub fn writes(&self) -> &[Write] { &self.writes }

    pub fn is_empty(&self) -> bool { self.writes.is_empty() }

    pub fn into_parts(self) -> (BTreeMap<Scope, u64>, Vec<Write>) { (self.expected, self.writes) }
}

impl From<Cluster> for Write {
    fn from(c: Cluster) -> Self { Write::PutCluster(c) }
}

impl From<Category> for Write {
    fn from(c: Category) -> Self { Write::PutCategory(c) }
}

impl From<Service> for Write {
    fn from(s: Service) -> Self { Write::PutService(s) }
}

/// Compare a client-supplied version with the stamp just read.
pub fn ensure_version(scope: Scope, current: u64, expected: Option<u64>) -> Result<(), TaxonomyError> {
    match expected {
        Some(v) if v != current => Err(TaxonomyError::OrderConflict(format!(
            "scope {} is at version {}, request expected {}",
            scope, current, v
        ))),
        _ => Ok(()),
    }
}

/// Which categories a read returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    /// Every active category, by cluster then order.
    Active,
    /// Active categories of one cluster, by order.
    InCluster(Uuid),
    Unassigned,
    Deleted,
}

/// Persistence for the taxonomy.
///
/// Reads return owned snapshots. Lists are sorted: clusters by order,
/// services by category then order, in-scope categories by order and
/// out-of-scope categories by creation time.
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    /// Current stamp of each scope; scopes never written are at `0`.
    async fn versions(&self, scopes: &[Scope]) -> Result<HashMap<Scope, u64>, TaxonomyError>;

    async fn version(&self, scope: Scope) -> Result<u64, TaxonomyError> {
        let versions = self.versions(&[scope]).await?;
        Ok(versions.get(&scope).copied().unwrap_or(0))
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, TaxonomyError>;
    async fn cluster(&self, id: Uuid) -> Result<Option<Cluster>, TaxonomyError>;

    async fn categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, TaxonomyError>;
    async fn category(&self, id: Uuid) -> Result<Option<Category>, TaxonomyError>;

    /// Services of the given categories.
    async fn services(&self, category_ids: &[Uuid]) -> Result<Vec<Service>, TaxonomyError>;
    async fn service(&self, id: Uuid) -> Result<Option<Service>, TaxonomyError>;

    /// Apply a change set atomically; a stale expected version fails with
    /// `OrderConflict` and leaves the store untouched.
    async fn commit(&self, changes: ChangeSet) -> Result<(), TaxonomyError>;
}
