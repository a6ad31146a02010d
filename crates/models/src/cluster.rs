use sea_orm::entity::prelude::*;
use uuid::Uuid;
use serde::{Deserialize, Serialize};

use crate::{category, cluster_translation};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cluster")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_in_list: i32,
    pub icon: String,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Translations, Categories }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Translations => Entity::has_many(cluster_translation::Entity).into(),
            Relation::Categories => Entity::has_many(category::Entity).into(),
        }
    }
}

impl Related<cluster_translation::Entity> for Entity {
    fn to() -> RelationDef { Relation::Translations.def() }
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef { Relation::Categories.def() }
}

impl ActiveModelBehavior for ActiveModel {}
