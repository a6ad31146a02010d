//! Create the per-entity translation tables.
//!
//! Each row is keyed by `(owner_id, language_code)` so one locale appears at most once per entity.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClusterTranslation::Table)
                    .if_not_exists()
                    .col(uuid(ClusterTranslation::ClusterId).not_null())
                    .col(string_len(ClusterTranslation::LanguageCode, 16).not_null())
                    .col(string_len(ClusterTranslation::Name, 255).not_null())
                    .col(text_null(ClusterTranslation::Description))
                    .primary_key(
                        Index::create()
                            .col(ClusterTranslation::ClusterId)
                            .col(ClusterTranslation::LanguageCode),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cluster_translation_cluster")
                            .from(ClusterTranslation::Table, ClusterTranslation::ClusterId)
                            .to(Cluster::Table, Cluster::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CategoryTranslation::Table)
                    .if_not_exists()
                    .col(uuid(CategoryTranslation::CategoryId).not_null())
                    .col(string_len(CategoryTranslation::LanguageCode, 16).not_null())
                    .col(string_len(CategoryTranslation::Name, 255).not_null())
                    .col(text_null(CategoryTranslation::Description))
                    .primary_key(
                        Index::create()
                            .col(CategoryTranslation::CategoryId)
                            .col(CategoryTranslation::LanguageCode),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_translation_category")
                            .from(CategoryTranslation::Table, CategoryTranslation::CategoryId)
                            .to(Category::Table, Category::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceTranslation::Table)
                    .if_not_exists()
                    .col(uuid(ServiceTranslation::ServiceId).not_null())
                    .col(string_len(ServiceTranslation::LanguageCode, 16).not_null())
                    .col(string_len(ServiceTranslation::Name, 255).not_null())
                    .col(text_null(ServiceTranslation::Description))
                    .primary_key(
                        Index::create()
                            .col(ServiceTranslation::ServiceId)
                            .col(ServiceTranslation::LanguageCode),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_translation_service")
                            .from(ServiceTranslation::Table, ServiceTranslation::ServiceId)
                            .to(Service::Table, Service::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(ServiceTranslation::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(CategoryTranslation::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(ClusterTranslation::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum ClusterTranslation { Table, ClusterId, LanguageCode, Name, Description }

#[derive(DeriveIden)]
enum CategoryTranslation { Table, CategoryId, LanguageCode, Name, Description }

#[derive(DeriveIden)]
enum ServiceTranslation { Table, ServiceId, LanguageCode, Name, Description }

#[derive(DeriveIden)]
enum Cluster { Table, Id }

#[derive(DeriveIden)]
enum Category { Table, Id }

#[derive(DeriveIden)]
enum Service { Table, Id }
