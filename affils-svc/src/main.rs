//! affils-svc - Affiliations service
//!
//! REST service tracking curation expert panel affiliations. Affiliation
//! and expert panel identifiers are system-generated; protected endpoints
//! require an API key.

use affils_common::api::auth::create_api_key;
use affils_common::config::{database_path, resolve_root_folder};
use affils_common::db::init_database;
use affils_svc::{build_router, AppState, Sentinels};
use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "affils-svc", about = "Affiliations service")]
struct Args {
    /// Root folder holding the database (overrides env and config file)
    #[arg(long)]
    root_folder: Option<String>,

    /// Listen port
    #[arg(long, default_value_t = 5730)]
    port: u16,

    /// Issue a new write-capable API key with the given name and exit
    #[arg(long, value_name = "NAME")]
    issue_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting Affiliations Service (affils-svc) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), "AFFILS_ROOT")?;
    let db_path = database_path(&root_folder)?;
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path).await?;
    info!("✓ Database initialized");

    // One-shot key issuance for operators; prints the raw key exactly once
    if let Some(name) = args.issue_key {
        let raw_key = create_api_key(&pool, &name, true, None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to issue API key: {}", e))?;
        println!("{}", raw_key);
        return Ok(());
    }

    // Sentinel working groups are seeded at init; resolve them once so
    // validation compares row IDs instead of querying by name per request
    let sentinels = Sentinels::load(&pool).await?;
    info!("✓ Resolved sentinel working groups");

    let state = AppState::new(pool, sentinels);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port)).await?;
    info!("affils-svc listening on http://127.0.0.1:{}", args.port);
    info!("Health check: http://127.0.0.1:{}/health", args.port);

    axum::serve(listener, app).await?;

    Ok(())
}
