//! Create `category` table.
//!
//! `cluster_id` + `is_deleted` encode placement: both unset means unassigned,
//! a cluster with `is_deleted = false` means active (and `order_in_cluster` is set),
//! `is_deleted = true` keeps `cluster_id` only as history.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(uuid(Category::Id).primary_key())
                    .col(string_len(Category::Icon, 255).not_null())
                    .col(uuid_null(Category::ClusterId))
                    .col(integer_null(Category::OrderInCluster))
                    .col(boolean(Category::IsDeleted).not_null())
                    .col(timestamp_with_time_zone(Category::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Category::UpdatedAt).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_cluster")
                            .from(Category::Table, Category::ClusterId)
                            .to(Cluster::Table, Cluster::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Category::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Category { Table, Id, Icon, ClusterId, OrderInCluster, IsDeleted, CreatedAt, UpdatedAt }

#[derive(DeriveIden)]
enum Cluster { Table, Id }
