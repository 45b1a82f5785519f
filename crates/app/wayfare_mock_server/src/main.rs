//! Wayfare mock API server binary.
//!
//! Serves the in-memory mock API for local development of Wayfare clients.

use clap::Parser;
use tracing::info;
use wayfare_mock_api::config::{MockApiConfig, RotationPolicy};

/// CLI arguments for the mock server.
#[derive(Parser, Debug)]
#[command(name = "wayfare_mock_server", about = "Wayfare mock API server")]
struct Args {
    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Refresh token rotation: always, never or random.
    #[arg(long, env = "MOCK_ROTATION")]
    rotation: Option<RotationPolicy>,

    /// Probability (0..=1) that a search answers 429.
    #[arg(long, env = "MOCK_RATE_LIMIT")]
    rate_limit: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,wayfare_mock_api=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = MockApiConfig::from_env();
    if let Some(rotation) = args.rotation {
        config.rotation = rotation;
    }
    if let Some(p) = args.rate_limit {
        config.rate_limit_probability = p.clamp(0.0, 1.0);
    }

    info!(
        rotation = %config.rotation,
        rate_limit = config.rate_limit_probability,
        access_ttl_secs = config.access_ttl_secs,
        "starting wayfare_mock_server"
    );

    let app = wayfare_mock_api::router(wayfare_mock_api::AppState::new(config));

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(addr = %listener.local_addr()?, "mock API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
