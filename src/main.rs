use axum::serve;
use roster_board::api::routes::create_router;
use roster_board::config::AppConfig;
use roster_board::seed;
use roster_board::store::MemoryStore;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize logging with explicit filter to keep HTTP client internals quiet
    use env_logger::Builder;
    use log::LevelFilter;
    use std::str::FromStr;

    let level = LevelFilter::from_str(&config.logging.level).unwrap_or(LevelFilter::Info);
    Builder::new()
        .filter_level(level)
        .filter_module("hyper", LevelFilter::Warn)
        .filter_module("reqwest", LevelFilter::Warn)
        .init();

    println!("Roster Board: classroom assignment service");
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = Arc::new(MemoryStore::new());

    // Load seed data for demonstration (optional)
    if config.seed.enabled {
        println!("Loading seed data...");
        let summary = seed::load_seed_data(&store);
        println!(
            "Seed data loaded: {} schools, {} classrooms, {} enrollments",
            summary.schools, summary.classrooms, summary.enrollments
        );
    }

    run_server(create_router().with_state(store), &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("Roster service running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
