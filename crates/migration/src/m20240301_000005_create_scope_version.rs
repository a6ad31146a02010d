//! Create `scope_version` table.
//!
//! One row per ordering scope (`clusters`, `cluster:<id>`, `category:<id>`); a missing row means version 0.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScopeVersion::Table)
                    .if_not_exists()
                    .col(string_len(ScopeVersion::Scope, 64).primary_key())
                    .col(big_integer(ScopeVersion::Version).not_null())
                    .col(timestamp_with_time_zone(ScopeVersion::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ScopeVersion::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ScopeVersion { Table, Scope, Version, UpdatedAt }
