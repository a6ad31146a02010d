use std::process::ExitCode;

use common::utils::logging::{init_logging, LogFormat};
use configs::AppConfig;
use dotenvy::dotenv;
use tracing::{error, info, warn};
use uuid::Uuid;

/// `config.toml` (or `CONFIG_PATH`) when present, otherwise environment defaults.
fn load_config() -> anyhow::Result<(AppConfig, Option<anyhow::Error>)> {
    match AppConfig::load_and_validate() {
        Ok(cfg) => Ok((cfg, None)),
        Err(file_err) => Ok((AppConfig::from_env()?, Some(file_err))),
    }
}

fn main() -> ExitCode {
    // .env first so RUST_LOG and friends apply
    dotenv().ok();

    let (cfg, file_err) = match load_config() {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(LogFormat::Compact);
            error!(service = "server", event = "config_invalid", error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    init_logging(LogFormat::parse(&cfg.logging.format));
    if let Some(e) = file_err {
        warn!(service = "server", event = "config_fallback", error = %e, "config file unusable, using environment");
    }
    if cfg.auth.uses_dev_secret() {
        warn!(service = "server", event = "dev_jwt_secret", "auth.jwt_secret is the development secret; admin tokens are forgeable");
    }

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "server", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let worker_threads = cfg.server.worker_threads;
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "server", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "server",
        event = "start",
        %service_id,
        pid,
        version,
        threads = worker_threads.unwrap_or_default(),
        "server starting"
    );

    rt.block_on(async move {
        let server_task = tokio::spawn(server::run(cfg));
        tokio::select! {
            res = server_task => match res {
                Ok(Ok(())) => {
                    info!(service = "server", event = "stop", %service_id, pid, "server stopped normally");
                    ExitCode::SUCCESS
                }
                Ok(Err(e)) => {
                    error!(service = "server", event = "run_failed", error = %e, "server::run returned error");
                    ExitCode::FAILURE
                }
                Err(e) => {
                    error!(service = "server", event = "task_join_error", error = %e, "server task join error");
                    ExitCode::FAILURE
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!(service = "server", event = "shutdown_signal", %service_id, pid, "received Ctrl+C, shutting down");
                ExitCode::SUCCESS
            }
        }
    })
}
