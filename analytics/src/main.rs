use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use courier_analytics::{handlers, AppState, DEFAULT_PORT, SERVICE_NAME};
use courier_config::ServiceSettings;
use courier_database::{Database, DatabaseConfig, TimedCache};
use courier_observability::{init_tracing, observability, TracingConfig};

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(TracingConfig::for_service(SERVICE_NAME));

    let settings = ServiceSettings::from_env(SERVICE_NAME, DEFAULT_PORT)?;
    let redis_enabled = settings.feature_toggles.redis_enabled();
    if !redis_enabled {
        tracing::warn!("[Analytics Service] Redis disabled via feature toggles; using in-memory cache");
    }

    tracing::info!("[Analytics Service] Connecting to database...");
    let db_config = DatabaseConfig::from_env()?;
    let database = Database::new(&db_config, redis_enabled).await?;
    tracing::info!("[Analytics Service] Database connection established");

    let repositories = database.repositories();
    let cache = TimedCache::new(database.cache_store(), settings.cache_timeout);
    tracing::info!(backend = cache.backend(), "[Analytics Service] Cache ready");

    let state = AppState::new(
        Arc::new(repositories.metrics()),
        Arc::new(repositories.reports()),
        cache,
        &settings,
    );

    let port = settings.port;
    tracing::info!("[Analytics Service] Starting on port {}", port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(observability(SERVICE_NAME))
            .configure(handlers::configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    Ok(())
}
