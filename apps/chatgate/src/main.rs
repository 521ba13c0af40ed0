use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod cli;

use chatgate_core::{
    AuthGate, EffectiveConfig, MockBackend, ModelCatalog, RateLimiter, resolve_policy,
};
use chatgate_router::{GatewayState, gateway_router};

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // Startup misconfiguration in strict environments lands here before
        // the listener ever binds.
        eprintln!("chatgate failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let config = EffectiveConfig::from_env(&cli.overrides())?;
    let policy = resolve_policy(config.environment);
    info!(
        environment = %config.environment,
        strict = policy.strict,
        tokens = config.api_auth_tokens.len(),
        rate_limit_per_minute = config.rate_limit_per_minute,
        log_level = %config.log_level,
        "config resolved"
    );

    let state = GatewayState {
        auth: Arc::new(AuthGate::new(config.api_auth_tokens.clone())),
        limiter: Arc::new(RateLimiter::new(config.rate_limit_per_minute)),
        backend: Arc::new(MockBackend::new()),
        catalog: Arc::new(ModelCatalog::new()),
    };
    let app = gateway_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let fallback = std::env::var("LOG_LEVEL")
        .map(|level| format!("chatgate={}", level.trim().to_ascii_lowercase()))
        .unwrap_or_else(|_| "chatgate=info".to_string());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
