use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::{debug, warn};
use uuid::Uuid;

use models::validate::{order_from_db, order_to_db};
use models::{category, category_translation, cluster, cluster_translation, scope_version, service, service_translation};

use crate::errors::TaxonomyError;
use crate::taxonomy::domain::{Category, Cluster, Placement, Scope, Service, Translation, Translations};
use crate::taxonomy::repository::{CategoryFilter, ChangeSet, TaxonomyStore, Write};

/// Postgres-backed store; each commit is one database transaction.
pub struct SeaOrmTaxonomyStore {
    pub db: DatabaseConnection,
}

impl SeaOrmTaxonomyStore {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }
}

type Row = (Uuid, String, String, Option<String>);

fn group_translations(rows: Vec<Row>) -> HashMap<Uuid, Translations> {
    let mut grouped: HashMap<Uuid, Vec<(String, Translation)>> = HashMap::new();
    for (owner, code, name, description) in rows {
        grouped.entry(owner).or_default().push((code, Translation { name, description }));
    }
    grouped.into_iter().map(|(k, v)| (k, Translations::from_stored(v))).collect()
}

async fn cluster_translations<C: ConnectionTrait>(db: &C, ids: Vec<Uuid>) -> Result<HashMap<Uuid, Translations>, TaxonomyError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = cluster_translation::Entity::find()
        .filter(cluster_translation::Column::ClusterId.is_in(ids))
        .all(db)
        .await?;
    Ok(group_translations(rows.into_iter().map(|t| (t.cluster_id, t.language_code, t.name, t.description)).collect()))
}

async fn category_translations<C: ConnectionTrait>(db: &C, ids: Vec<Uuid>) -> Result<HashMap<Uuid, Translations>, TaxonomyError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = category_translation::Entity::find()
        .filter(category_translation::Column::CategoryId.is_in(ids))
        .all(db)
        .await?;
    Ok(group_translations(rows.into_iter().map(|t| (t.category_id, t.language_code, t.name, t.description)).collect()))
}

async fn service_translations<C: ConnectionTrait>(db: &C, ids: Vec<Uuid>) -> Result<HashMap<Uuid, Translations>, TaxonomyError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = service_translation::Entity::find()
        .filter(service_translation::Column::ServiceId.is_in(ids))
        .all(db)
        .await?;
    Ok(group_translations(rows.into_iter().map(|t| (t.service_id, t.language_code, t.name, t.description)).collect()))
}

fn utc(dt: sea_orm::prelude::DateTimeWithTimeZone) -> DateTime<Utc> { dt.with_timezone(&Utc) }

fn cluster_from_row(m: cluster::Model, translations: Translations) -> Result<Cluster, TaxonomyError> {
    Ok(Cluster {
        id: m.id,
        order: order_from_db(m.order_in_list)?,
        icon: m.icon,
        is_active: m.is_active,
        translations,
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    })
}

fn category_from_row(m: category::Model, translations: Translations) -> Result<Category, TaxonomyError> {
    let order = m.order_in_cluster.map(order_from_db).transpose()?;
    Ok(Category {
        id: m.id,
        icon: m.icon,
        placement: Placement::from_columns(m.cluster_id, order, m.is_deleted)?,
        translations,
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    })
}

fn service_from_row(m: service::Model, translations: Translations) -> Result<Service, TaxonomyError> {
    Ok(Service {
        id: m.id,
        category_id: m.category_id,
        order: order_from_db(m.order_in_category)?,
        translations,
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
    })
}

impl SeaOrmTaxonomyStore {
    async fn check_and_bump(&self, txn: &DatabaseTransaction, scope: Scope, expected: u64) -> Result<(), TaxonomyError> {
        let key = scope.key();
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let next = i64::try_from(expected + 1).map_err(|_| TaxonomyError::Store(format!("version overflow on {}", key)))?;
        let affected = if expected == 0 {
            let am = scope_version::ActiveModel { scope: Set(key.clone()), version: Set(1), updated_at: Set(now) };
            scope_version::Entity::insert(am)
                .on_conflict(OnConflict::column(scope_version::Column::Scope).do_nothing().to_owned())
                .exec_without_returning(txn)
                .await?
        } else {
            scope_version::Entity::update_many()
                .col_expr(scope_version::Column::Version, Expr::value(next))
                .col_expr(scope_version::Column::UpdatedAt, Expr::value(now))
                .filter(scope_version::Column::Scope.eq(key.clone()))
                .filter(scope_version::Column::Version.eq(next - 1))
                .exec(txn)
                .await?
                .rows_affected
        };
        if affected != 1 {
            return Err(TaxonomyError::OrderConflict(format!("scope {} changed concurrently (expected version {})", key, expected)));
        }
        Ok(())
    }

    async fn apply(&self, txn: &DatabaseTransaction, write: Write) -> Result<(), TaxonomyError> {
        match write {
            Write::PutCluster(c) => {
                let am = cluster::ActiveModel {
                    id: Set(c.id),
                    order_in_list: Set(order_to_db(c.order)?),
                    icon: Set(c.icon),
                    is_active: Set(c.is_active),
                    created_at: Set(c.created_at.into()),
                    updated_at: Set(c.updated_at.into()),
                };
                cluster::Entity::insert(am)
                    .on_conflict(
                        OnConflict::column(cluster::Column::Id)
                            .update_columns([
                                cluster::Column::OrderInList,
                                cluster::Column::Icon,
                                cluster::Column::IsActive,
                                cluster::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;
                cluster_translation::Entity::delete_many()
                    .filter(cluster_translation::Column::ClusterId.eq(c.id))
                    .exec(txn)
                    .await?;
                let rows: Vec<cluster_translation::ActiveModel> = c
                    .translations
                    .iter()
                    .map(|(code, t)| cluster_translation::ActiveModel {
                        cluster_id: Set(c.id),
                        language_code: Set(code.to_string()),
                        name: Set(t.name.clone()),
                        description: Set(t.description.clone()),
                    })
                    .collect();
                if !rows.is_empty() {
                    cluster_translation::Entity::insert_many(rows).exec_without_returning(txn).await?;
                }
            }
            Write::DeleteCluster(id) => {
                cluster::Entity::delete_by_id(id).exec(txn).await?;
            }
            Write::PutCategory(c) => {
                let cols = c.placement.columns();
                models::category::validate_placement_columns(
                    cols.cluster_id,
                    cols.order_in_cluster.map(order_to_db).transpose()?,
                    cols.is_deleted,
                )?;
                let am = category::ActiveModel {
                    id: Set(c.id),
                    icon: Set(c.icon),
                    cluster_id: Set(cols.cluster_id),
                    order_in_cluster: Set(cols.order_in_cluster.map(order_to_db).transpose()?),
                    is_deleted: Set(cols.is_deleted),
                    created_at: Set(c.created_at.into()),
                    updated_at: Set(c.updated_at.into()),
                };
                category::Entity::insert(am)
                    .on_conflict(
                        OnConflict::column(category::Column::Id)
                            .update_columns([
                                category::Column::Icon,
                                category::Column::ClusterId,
                                category::Column::OrderInCluster,
                                category::Column::IsDeleted,
                                category::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;
                category_translation::Entity::delete_many()
                    .filter(category_translation::Column::CategoryId.eq(c.id))
                    .exec(txn)
                    .await?;
                let rows: Vec<category_translation::ActiveModel> = c
                    .translations
                    .iter()
                    .map(|(code, t)| category_translation::ActiveModel {
                        category_id: Set(c.id),
                        language_code: Set(code.to_string()),
                        name: Set(t.name.clone()),
                        description: Set(t.description.clone()),
                    })
                    .collect();
                if !rows.is_empty() {
                    category_translation::Entity::insert_many(rows).exec_without_returning(txn).await?;
                }
            }
            Write::PutService(s) => {
                let am = service::ActiveModel {
                    id: Set(s.id),
                    category_id: Set(s.category_id),
                    order_in_category: Set(order_to_db(s.order)?),
                    created_at: Set(s.created_at.into()),
                    updated_at: Set(s.updated_at.into()),
                };
                service::Entity::insert(am)
                    .on_conflict(
                        OnConflict::column(service::Column::Id)
                            .update_columns([
                                service::Column::CategoryId,
                                service::Column::OrderInCategory,
                                service::Column::UpdatedAt,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(txn)
                    .await?;
                service_translation::Entity::delete_many()
                    .filter(service_translation::Column::ServiceId.eq(s.id))
                    .exec(txn)
                    .await?;
                let rows: Vec<service_translation::ActiveModel> = s
                    .translations
                    .iter()
                    .map(|(code, t)| service_translation::ActiveModel {
                        service_id: Set(s.id),
                        language_code: Set(code.to_string()),
                        name: Set(t.name.clone()),
                        description: Set(t.description.clone()),
                    })
                    .collect();
                if !rows.is_empty() {
                    service_translation::Entity::insert_many(rows).exec_without_returning(txn).await?;
                }
            }
            Write::DeleteService(id) => {
                service::Entity::delete_by_id(id).exec(txn).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TaxonomyStore for SeaOrmTaxonomyStore {
    async fn versions(&self, scopes: &[Scope]) -> Result<HashMap<Scope, u64>, TaxonomyError> {
        let keys: Vec<String> = scopes.iter().map(Scope::key).collect();
        let rows = scope_version::Entity::find()
            .filter(scope_version::Column::Scope.is_in(keys))
            .all(&self.db)
            .await?;
        let by_key: HashMap<String, i64> = rows.into_iter().map(|r| (r.scope, r.version)).collect();
        Ok(scopes
            .iter()
            .map(|s| (*s, by_key.get(&s.key()).map(|v| u64::try_from(*v).unwrap_or(0)).unwrap_or(0)))
            .collect())
    }

    async fn clusters(&self) -> Result<Vec<Cluster>, TaxonomyError> {
        let rows = cluster::Entity::find()
            .order_by_asc(cluster::Column::OrderInList)
            .order_by_asc(cluster::Column::CreatedAt)
            .all(&self.db)
            .await?;
        let mut translations = cluster_translations(&self.db, rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|r| {
                let t = translations.remove(&r.id).unwrap_or_default();
                cluster_from_row(r, t)
            })
            .collect()
    }

    async fn cluster(&self, id: Uuid) -> Result<Option<Cluster>, TaxonomyError> {
        let found = cluster::Entity::find_by_id(id)
            .find_with_related(cluster_translation::Entity)
            .all(&self.db)
            .await?;
        match found.into_iter().next() {
            Some((m, rows)) => {
                let t = Translations::from_stored(
                    rows.into_iter().map(|r| (r.language_code, Translation { name: r.name, description: r.description })),
                );
                Ok(Some(cluster_from_row(m, t)?))
            }
            None => Ok(None),
        }
    }

    async fn categories(&self, filter: CategoryFilter) -> Result<Vec<Category>, TaxonomyError> {
        let query = category::Entity::find();
        let query = match filter {
            CategoryFilter::All => query.order_by_asc(category::Column::CreatedAt).order_by_asc(category::Column::Id),
            CategoryFilter::Active => query
                .filter(category::Column::IsDeleted.eq(false))
                .filter(category::Column::ClusterId.is_not_null())
                .order_by_asc(category::Column::ClusterId)
                .order_by_asc(category::Column::OrderInCluster),
            CategoryFilter::InCluster(cluster_id) => query
                .filter(category::Column::IsDeleted.eq(false))
                .filter(category::Column::ClusterId.eq(cluster_id))
                .order_by_asc(category::Column::OrderInCluster)
                .order_by_asc(category::Column::Id),
            CategoryFilter::Unassigned => query
                .filter(category::Column::IsDeleted.eq(false))
                .filter(category::Column::ClusterId.is_null())
                .order_by_asc(category::Column::CreatedAt)
                .order_by_asc(category::Column::Id),
            CategoryFilter::Deleted => query
                .filter(category::Column::IsDeleted.eq(true))
                .order_by_asc(category::Column::CreatedAt)
                .order_by_asc(category::Column::Id),
        };
        let rows = query.all(&self.db).await?;
        let mut translations = category_translations(&self.db, rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|r| {
                let t = translations.remove(&r.id).unwrap_or_default();
                category_from_row(r, t)
            })
            .collect()
    }

    async fn category(&self, id: Uuid) -> Result<Option<Category>, TaxonomyError> {
        let found = category::Entity::find_by_id(id)
            .find_with_related(category_translation::Entity)
            .all(&self.db)
            .await?;
        match found.into_iter().next() {
            Some((m, rows)) => {
                let t = Translations::from_stored(
                    rows.into_iter().map(|r| (r.language_code, Translation { name: r.name, description: r.description })),
                );
                Ok(Some(category_from_row(m, t)?))
            }
            None => Ok(None),
        }
    }

    async fn services(&self, category_ids: &[Uuid]) -> Result<Vec<Service>, TaxonomyError> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = service::Entity::find()
            .filter(service::Column::CategoryId.is_in(category_ids.to_vec()))
            .order_by_asc(service::Column::CategoryId)
            .order_by_asc(service::Column::OrderInCategory)
            .all(&self.db)
            .await?;
        let mut translations = service_translations(&self.db, rows.iter().map(|r| r.id).collect()).await?;
        rows.into_iter()
            .map(|r| {
                let t = translations.remove(&r.id).unwrap_or_default();
                service_from_row(r, t)
            })
            .collect()
    }

    async fn service(&self, id: Uuid) -> Result<Option<Service>, TaxonomyError> {
        let found = service::Entity::find_by_id(id)
            .find_with_related(service_translation::Entity)
            .all(&self.db)
            .await?;
        match found.into_iter().next() {
            Some((m, rows)) => {
                let t = Translations::from_stored(
                    rows.into_iter().map(|r| (r.language_code, Translation { name: r.name, description: r.description })),
                );
                Ok(Some(service_from_row(m, t)?))
            }
            None => Ok(None),
        }
    }

    async fn commit(&self, changes: ChangeSet) -> Result<(), TaxonomyError> {
        let (expected, writes) = changes.into_parts();
        let txn = self.db.begin().await?;
        for (scope, version) in expected {
            if let Err(e) = self.check_and_bump(&txn, scope, version).await {
                warn!(scope = %scope, expected = version, "scope version check failed");
                txn.rollback().await?;
                return Err(e);
            }
        }
        let count = writes.len();
        for write in writes {
            if let Err(e) = self.apply(&txn, write).await {
                txn.rollback().await?;
                return Err(e);
            }
        }
        txn.commit().await?;
        debug!(writes = count, "change set committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, skip_db_tests};
    use crate::taxonomy::domain::TranslationEntry;

    fn translations(name: &str) -> Translations {
        Translations::from_entries(vec![TranslationEntry {
            language_code: "en".into(),
            name: name.into(),
            description: None,
        }])
        .unwrap()
    }

    #[tokio::test]
    async fn commit_round_trips_and_checks_versions() -> anyhow::Result<()> {
        if skip_db_tests() {
            return Ok(());
        }
        let store = SeaOrmTaxonomyStore::new(get_db().await?);
        let now = Utc::now();
        let cluster = Cluster {
            id: Uuid::new_v4(),
            order: 0,
            icon: "box".into(),
            is_active: true,
            translations: translations("Tech"),
            created_at: now,
            updated_at: now,
        };
        let category = Category {
            id: Uuid::new_v4(),
            icon: "code".into(),
            placement: Placement::Active { cluster_id: cluster.id, order: 0 },
            translations: translations("Frontend"),
            created_at: now,
            updated_at: now,
        };
        let scope = Scope::Cluster(cluster.id);
        let mut cs = ChangeSet::new();
        cs.expect(scope, 0)
            .push(Write::PutCluster(cluster.clone()))
            .push(Write::PutCategory(category.clone()));
        store.commit(cs).await?;

        assert_eq!(store.version(scope).await?, 1);
        let loaded = store.category(category.id).await?.expect("category stored");
        assert_eq!(loaded.placement, category.placement);
        assert_eq!(loaded.translations.get("en").map(|t| t.name.as_str()), Some("Frontend"));

        let mut stale = ChangeSet::new();
        stale.expect(scope, 0).push(Write::DeleteCluster(cluster.id));
        assert!(matches!(store.commit(stale).await, Err(TaxonomyError::OrderConflict(_))));
        assert!(store.cluster(cluster.id).await?.is_some());

        // cleanup
        let mut cs = ChangeSet::new();
        let mut gone = category.clone();
        gone.placement = Placement::Deleted { former_cluster_id: None };
        cs.push(Write::PutCategory(gone)).push(Write::DeleteCluster(cluster.id));
        store.commit(cs).await?;
        Ok(())
    }
}
