use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Category: scope lookups by (cluster_id, is_deleted)
        manager
            .create_index(
                Index::create()
                    .name("idx_category_cluster_deleted")
                    .table(Category::Table)
                    .col(Category::ClusterId)
                    .col(Category::IsDeleted)
                    .to_owned(),
            )
            .await?;

        // Service: scope lookups by category_id
        manager
            .create_index(
                Index::create()
                    .name("idx_service_category")
                    .table(Service::Table)
                    .col(Service::CategoryId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_category_cluster_deleted").table(Category::Table).to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_service_category").table(Service::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Category { Table, ClusterId, IsDeleted }

#[derive(DeriveIden)]
enum Service { Table, CategoryId }
