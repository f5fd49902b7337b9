pub mod types;
pub mod config;
pub mod error;
pub mod bracket;
pub mod scoring;
pub mod participants;
pub mod store;
pub mod server;

use config::*;
use server::ServerState;
use store::TournamentStore;
use types::SharedStore;

use std::{
    fs,
    sync::{Arc, Mutex},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── Entry point ────────────────────────────────────────────────────────

pub fn run() {
    load_env_file();
    let loaded = load_config_inner();
    let config = loaded.clone().unwrap_or_else(|_| apply_env_defaults(ServerConfig::default()));

    // Initialize tracing with a daily rolling file
    let logs_dir = config.resolved_log_dir();
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "bracket.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Knockout bracket server starting");
    if let Err(e) = loaded {
        error!("{e}; using defaults");
    }
    log_env_warnings(&config);

    let store: SharedStore = Arc::new(Mutex::new(TournamentStore::new(config.resolved_shuffle_seed())));
    let state = ServerState {
        store,
        log_requests: config.log_requests,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to start async runtime: {e}");
            return;
        }
    };
    runtime.block_on(server::serve(state, &config.bind_addr));
}
