//! Migrator registering taxonomy migrations in dependency order.
//! Indexes are applied last.
pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_cluster;
mod m20240301_000002_create_category;
mod m20240301_000003_create_service;
mod m20240301_000004_create_translations;
mod m20240301_000005_create_scope_version;
mod m20240301_000010_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_cluster::Migration),
            Box::new(m20240301_000002_create_category::Migration),
            Box::new(m20240301_000003_create_service::Migration),
            Box::new(m20240301_000004_create_translations::Migration),
            Box::new(m20240301_000005_create_scope_version::Migration),
            // Indexes should always be applied last
            Box::new(m20240301_000010_add_indexes::Migration),
        ]
    }
}
