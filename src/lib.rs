pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the board and its parts
pub use logic::{
    AssignmentBoard, FilterContextResolver, MoveTicket, MoveValidator, MutationEngine, RosterStatus,
    RosterStore, Verdict,
};

pub use error::{ContextError, StoreError, StoreResult};

// Export all model types
pub use model::*;

// Export store types
pub use store::{HttpStore, MemoryStore, Store};

/// Serve the reference roster API from an in-memory store
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use std::sync::Arc;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .try_init();

    let store = Arc::new(MemoryStore::new());
    if config.seed.enabled {
        seed::load_seed_data(&store);
    }

    // Create router with state
    let app = crate::api::routes::create_router().with_state(store);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
