use anyhow::{Context, Result};
use clap::Parser;
use liquidity_structure::api::{router, AppState};
use liquidity_structure::EngineConfig;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to run the web server on
    #[arg(short, long, env = "PORT", default_value = "3000")]
    port: u16,

    /// Engine parameters (JSON); defaults apply when omitted
    #[arg(short, long, env = "ENGINE_CONFIG")]
    engine_config: Option<PathBuf>,

    /// Timezone that defines trading days for history requests
    #[arg(short = 't', long, env = "SESSION_TZ", default_value = "UTC")]
    session_tz: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("liquidity_structure=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let config = EngineConfig::load(args.engine_config.as_deref())?;
    let tz: chrono_tz::Tz = args
        .session_tz
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Invalid session timezone: {}", args.session_tz))?;

    info!("Starting liquidity structure server");
    info!("Port: {}", args.port);
    info!("Session timezone: {}", tz);
    info!(
        "Sweep lookback: {}, volume surge: {}x",
        config.sweep_lookback, config.volume_surge_mult
    );

    let state = Arc::new(AppState::new(config, tz));

    let app = router(state).layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any));

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    info!("Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
