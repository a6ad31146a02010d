//! Create `cluster` table.
//!
//! Top-level taxonomy grouping; `order_in_list` is dense across all rows.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Cluster::Table)
                    .if_not_exists()
                    .col(uuid(Cluster::Id).primary_key())
                    .col(integer(Cluster::OrderInList).not_null())
                    .col(string_len(Cluster::Icon, 255).not_null())
                    .col(boolean(Cluster::IsActive).not_null())
                    .col(timestamp_with_time_zone(Cluster::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Cluster::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Cluster::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Cluster { Table, Id, OrderInList, Icon, IsActive, CreatedAt, UpdatedAt }
