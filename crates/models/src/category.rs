use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{category_translation, cluster, errors, service};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "category")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub icon: String,
    pub cluster_id: Option<Uuid>,
    pub order_in_cluster: Option<i32>,
    pub is_deleted: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Cluster, Translations, Services }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Cluster => Entity::belongs_to(cluster::Entity)
                .from(Column::ClusterId)
                .to(cluster::Column::Id)
                .into(),
            Relation::Translations => Entity::has_many(category_translation::Entity).into(),
            Relation::Services => Entity::has_many(service::Entity).into(),
        }
    }
}

impl Related<cluster::Entity> for Entity {
    fn to() -> RelationDef { Relation::Cluster.def() }
}

impl Related<category_translation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Translations.def() }
}

impl Related<service::Entity> for Entity {
    fn to() -> RelationDef { Relation::Services.def() }
}

impl ActiveModelBehavior for ActiveModel {}

/// Reject column combinations that do not describe a placement:
/// an active row needs both a cluster and an order, other rows carry no order.
pub fn validate_placement_columns(cluster_id: Option<Uuid>, order_in_cluster: Option<i32>, is_deleted: bool) -> Result<(), errors::ModelError> {
    match (cluster_id, order_in_cluster, is_deleted) {
        (Some(_), Some(o), false) if o >= 0 => Ok(()),
        (None, None, false) => Ok(()),
        (_, None, true) => Ok(()),
        _ => Err(errors::ModelError::Validation("inconsistent category placement columns".into())),
    }
}
