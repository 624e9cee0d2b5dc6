use build_status_badge::handlers::router;
use build_status_badge::storage::gcs::GcsStorage;
use build_status_badge::{AppState, VALUE_NOT_SET, WatchConfig};
use std::sync::Arc;
use tracing::{self, info};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let bind_address =
        std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string());

    let config = match WatchConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt::init();

    info!(
        "Repository name regex to watch for builds: '{}'",
        config.repo_name_pattern
    );
    info!(
        "Branch name regex to watch for builds: '{}'",
        config.branch_name_pattern
    );
    info!(
        "Tag name regex to watch for builds: '{}'",
        config
            .tag_name_pattern
            .as_ref()
            .map(|pattern| pattern.as_str())
            .unwrap_or(VALUE_NOT_SET)
    );
    info!("Storage bucket name to use: '{}'", config.bucket_name);
    info!(
        "Last build status badge name to use: '{}'",
        config.target_object_name()
    );

    let storage = GcsStorage::from_env();
    let state = Arc::new(AppState { config, storage });
    let app = router(state);

    info!("Listening on {}", bind_address);
    let listener = tokio::net::TcpListener::bind(bind_address).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
