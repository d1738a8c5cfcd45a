use axum::{routing::get, Router};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hatvenn::{channel::Hub, config::Config, puzzle::catalog, service::GameService, sweeper, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hatvenn=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting hat venn-dor...");

    let config = Config::from_env();

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rand::rng()),
    };
    let sets = match catalog::load(config.puzzle_file.as_deref(), &mut rng) {
        Ok(sets) => sets,
        Err(e) => {
            tracing::error!("Failed to load puzzle catalog: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded {} puzzle sets", sets.len());

    let hub = Arc::new(Hub::new(config.team_size));
    let game = Arc::new(GameService::new(hub.clone(), sets, config.rules()));

    // Expire participants that stopped polling
    sweeper::spawn_presence_purger(game.clone(), config.purge_interval);

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ws::AppState { hub, game });

    tracing::info!("Listening on http://{}", config.listen_addr);

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", config.listen_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
