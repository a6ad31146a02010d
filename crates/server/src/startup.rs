use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use configs::{AppConfig, StorageKind};
use migration::MigratorTrait;
use tower_http::cors::CorsLayer;
use tracing::info;

use service::taxonomy::repo::{MemoryTaxonomyStore, SeaOrmTaxonomyStore};
use service::taxonomy::{TaxonomyService, TaxonomyStore, TranslationResolver};

use crate::errors::StartupError;
use crate::routes::{self, auth};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the configured store; Postgres is migrated first when asked to.
pub async fn build_store(cfg: &AppConfig) -> Result<Arc<dyn TaxonomyStore>, StartupError> {
    match cfg.taxonomy.storage {
        StorageKind::Memory => {
            info!(storage = "memory", "taxonomy store ready");
            Ok(Arc::new(MemoryTaxonomyStore::new()))
        }
        StorageKind::Postgres => {
            let db_cfg = models::db::DatabaseConfig::from(&cfg.database);
            let db = models::db::connect_with_config(&db_cfg)
                .await
                .map_err(|e| StartupError::Database(e.to_string()))?;
            if cfg.taxonomy.run_migrations {
                migration::Migrator::up(&db, None)
                    .await
                    .map_err(|e| StartupError::Database(e.to_string()))?;
                info!("migrations applied");
            }
            info!(storage = "postgres", "taxonomy store ready");
            Ok(Arc::new(SeaOrmTaxonomyStore::new(db)))
        }
    }
}

pub fn build_state(store: Arc<dyn TaxonomyStore>, cfg: &AppConfig) -> auth::ServerState {
    let resolver = TranslationResolver::new(cfg.taxonomy.default_locale.clone());
    auth::ServerState {
        taxonomy: Arc::new(TaxonomyService::new(store, resolver)),
        auth: auth::ServerAuthConfig { jwt_secret: cfg.auth.jwt_secret.clone() },
    }
}

/// Assemble the application for an already-opened store.
pub fn build_app(store: Arc<dyn TaxonomyStore>, cfg: &AppConfig) -> Router {
    routes::build_router(
        build_state(store, cfg),
        build_cors(),
        Duration::from_secs(cfg.server.request_timeout_secs),
    )
}

fn bind_addr(cfg: &AppConfig) -> Result<SocketAddr, StartupError> {
    format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))
}

/// Public entry: open the store, build the app and run the HTTP server
pub async fn run(cfg: AppConfig) -> Result<(), StartupError> {
    let store = build_store(&cfg).await?;
    let app = build_app(store, &cfg);

    let addr = bind_addr(&cfg)?;
    info!(%addr, storage = ?cfg.taxonomy.storage, "starting taxonomy admin server");
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(anyhow::Error::from)?;
    axum::serve(listener, app).await.map_err(anyhow::Error::from)?;
    Ok(())
}
