//! tsync-api - transcriptions sync server
//!
//! Resolves the root folder, loads `tsync.toml`, opens the SQLite store and
//! serves the sync protocol over HTTP until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tsync_api::auth::{hash_token, TokenCapability};
use tsync_api::store::SqliteContentStore;
use tsync_api::{build_router, AppContext, AppState};
use tsync_common::config::{resolve_root_folder, SyncConfig, ROOT_FOLDER_ENV};

#[derive(Debug, Parser)]
#[command(name = "tsync-api", version, about = "Transcriptions sync server")]
struct Args {
    /// Root folder holding tsync.toml and the database
    #[arg(long)]
    root_folder: Option<String>,

    /// Override the configured port
    #[arg(long, env = "TSYNC_PORT")]
    port: Option<u16>,

    /// Override the configured bind address
    #[arg(long)]
    bind: Option<String>,

    /// Print the SHA-256 digest of a token for tsync.toml and exit
    #[arg(long, value_name = "TOKEN")]
    hash_token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(token) = args.hash_token.as_deref() {
        println!("{}", hash_token(token));
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification first, before any I/O
    info!(
        "Starting tsync-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV);
    info!("Root folder: {}", root_folder.display());

    let mut config = SyncConfig::load(&root_folder).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    config.validate().context("Invalid configuration")?;

    let db_path = config.database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = tsync_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let capability = TokenCapability::from_config(&config.api_tokens);
    if capability.is_empty() {
        warn!("No API tokens configured; every record request will be rejected");
    } else {
        info!("Loaded {} API token(s)", capability.len());
    }

    let ctx = AppContext::new(
        Arc::new(SqliteContentStore::new(pool)),
        Arc::new(capability),
        config.site_base(),
    );
    let app = build_router(AppState::new(ctx));

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("tsync-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("tsync-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
