use clap::Parser;
use nephro_core::{InferenceMode, NephroConfig};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use nephro_server::http::{self, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "nephro.toml")]
    config: String,

    /// Check the inference service and storage, then exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match NephroConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging: RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if config.inference.mode == InferenceMode::Demo {
        tracing::warn!(
            "Inference mode is 'demo': failed predictions are answered with fabricated estimates"
        );
    }

    let state = match HttpState::from_config(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to initialise server: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        let (_, report) = http::health_inner(&state).await;
        println!("{}", serde_json::to_string_pretty(&report)?);
        if report["status"] != "ok" {
            std::process::exit(1);
        }
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Shutdown signal received"),
            Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
