use anyhow::Context;

use plan_signup::config::FormConfig;
use plan_signup::wizard::{SignupState, signup_routes, spawn_prune_task};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = FormConfig::from_env().context("invalid configuration")?;

    eprintln!("📱 Plan Signup v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!("   Default referrer: {}", config.default_referrer.id);

    let state = SignupState::from_config(&config).context("failed to build HTTP clients")?;
    let _prune_handle = spawn_prune_task(state.sessions.clone(), config.session_ttl);

    let app = signup_routes(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(
        port = config.port,
        webhooks = config.webhooks.len(),
        "Signup server started"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
