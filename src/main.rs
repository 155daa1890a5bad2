//! Townhall - civic engagement service

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use townhall::{
    config::Args,
    db::MongoClient,
    server::{self, AppState},
    store::{MemoryStore, MongoStore, RecordStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("townhall={},info", args.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Townhall - civic engagement service");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    if args.memory_store {
        info!("Store: in-memory (records are lost on exit)");
    } else {
        info!("Store: MongoDB {} / {}", args.mongodb_uri, args.mongodb_db);
    }
    info!("======================================");

    let store: Arc<dyn RecordStore> = if args.memory_store {
        Arc::new(MemoryStore::new())
    } else {
        let client = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
            Ok(client) => client,
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };
        Arc::new(MongoStore::new(&client).await?)
    };

    let state = Arc::new(AppState::new(args, store)?);
    server::run(state).await?;

    Ok(())
}
