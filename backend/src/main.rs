mod config;
mod freshness;
mod ocr;
mod routes;
mod state;
mod vision;

use actix_cors::Cors;
use actix_web::middleware::{Condition, Logger};
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use routes::configure_routes;
use state::AppState;
use std::env;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    let config = AppConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {e}");
        std::io::Error::other(format!("Configuration error: {e}"))
    })?;

    let state = AppState::initialize(&config)
        .await
        .map_err(|e| std::io::Error::other(format!("Startup failed: {e}")))?;
    let state = web::Data::new(state);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {bind_address}");

    let cors_enabled = config.server.cors;
    let app_state = state.clone();
    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Condition::new(
                cors_enabled,
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            ))
            .app_data(app_state.clone())
            .configure(configure_routes)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;

    log::info!("Server stopped, shutting down services");
    match Arc::try_unwrap(state.into_inner()) {
        Ok(state) => state.shutdown(),
        Err(_) => log::warn!("Service state still referenced at shutdown"),
    }
    Ok(())
}
