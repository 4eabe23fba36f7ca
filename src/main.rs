//! gardenhub - community garden coordination API

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gardenhub::{
    auth::JwtValidator,
    config::Args,
    db::MongoClient,
    server::{self, AppState},
    store::{GardenStore, MemoryStore, MongoStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gardenhub={},info", args.log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  gardenhub {}", env!("CARGO_PKG_VERSION"));
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB: {} / {}", args.mongodb_uri, args.mongodb_db);
    info!("Max body: {} bytes, timeout: {} ms", args.max_body_bytes, args.request_timeout_ms);
    info!("======================================");

    let jwt = match args.jwt_secret.clone() {
        Some(secret) => JwtValidator::new(secret, args.jwt_expiry_seconds)?,
        None => {
            warn!("No JWT_SECRET set, using the built-in dev secret");
            JwtValidator::new_dev()
        }
    };

    let (store, storage): (Arc<dyn GardenStore>, &'static str) =
        match connect_mongo(&args).await {
            Ok(store) => {
                info!("MongoDB connected successfully");
                (Arc::new(store), "mongodb")
            }
            Err(e) if args.dev_mode => {
                warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
                (Arc::new(MemoryStore::new()), "memory")
            }
            Err(e) => {
                error!("MongoDB connection failed: {}", e);
                std::process::exit(1);
            }
        };

    let state = Arc::new(AppState::new(args, store, jwt, storage));
    server::run(state).await?;

    Ok(())
}

async fn connect_mongo(args: &Args) -> gardenhub::Result<MongoStore> {
    let client = MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await?;
    MongoStore::new(&client).await
}
