use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use leaderboard_service::config::StoreBackend;
use leaderboard_service::{handlers, AppState, Config};
use leaderboard_store::{LeaderboardStore, MemoryStore, RedisStore};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,leaderboard_service=debug".into());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        service = %config.service.service_name,
        port = config.service.http_port,
        "Starting leaderboard service"
    );

    let store: Arc<dyn LeaderboardStore> = match config.store.backend {
        StoreBackend::Redis => Arc::new(
            RedisStore::connect(&config.store.redis_url)
                .await
                .context("Failed to connect to Redis")?,
        ),
        StoreBackend::Memory => {
            warn!("Using in-memory leaderboard store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(store, config.leaderboard.clone());
    let bind_addr = (config.service.http_host.clone(), config.service.http_port);

    info!("Starting HTTP server on {}:{}", bind_addr.0, bind_addr.1);

    HttpServer::new(move || {
        App::new()
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::register_routes)
    })
    .bind(bind_addr)
    .context("Failed to bind HTTP server")?
    .run()
    .await
    .context("HTTP server error")
}
