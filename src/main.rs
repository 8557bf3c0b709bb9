//! Play Pass Server
//!
//! Serves the lives / session / score routes over HTTP.

use anyhow::Context;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use play_pass::{
    AuthConfig, MemoryStore, PlayPassServer, PlayPassService, ScorePolicy, ServerConfig,
    MAX_LIVES, REGEN_HOURS, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Play Pass Server v{}", VERSION);

    let config = ServerConfig::from_env()?;
    let auth = AuthConfig::from_env();
    let policy = ScorePolicy::from_env();

    info!("Lives: max {}, +1 every {}h", MAX_LIVES, REGEN_HOURS);
    info!("Session lifetime: {}s", auth.session_ttl.num_seconds());
    info!(
        "Score bound: {} pts/s + {} tolerance",
        policy.max_score_rate, policy.tolerance
    );

    match (&config.store_url, config.store_key.is_some()) {
        (Some(url), has_key) => warn!(
            "STORE_URL={} (key present: {}) ignored; this binary serves from the in-memory store",
            url, has_key
        ),
        (None, _) => info!("Using in-memory player store"),
    }

    let store = Arc::new(MemoryStore::new());
    let service = PlayPassService::new(store, &auth, policy)
        .context("SESSION_SECRET must be set to sign play sessions")?;
    let server = Arc::new(PlayPassServer::new(config, Arc::new(service)));

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
