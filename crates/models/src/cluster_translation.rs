use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::cluster;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cluster_translation")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cluster_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub language_code: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Cluster }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Cluster => Entity::belongs_to(cluster::Entity)
                .from(Column::ClusterId)
                .to(cluster::Column::Id)
                .into(),
        }
    }
}

impl Related<cluster::Entity> for Entity {
    fn to() -> RelationDef { Relation::Cluster.def() }
}

impl ActiveModelBehavior for ActiveModel {}
