use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use dermai::config::AppConfig;
use dermai::inference::{InferencePipeline, provider_from_config};
use dermai::routes::configure_routes;
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
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // A failed load is kept and reported per request; the server still starts.
    let provider = Arc::new(provider_from_config(&config));
    if let Err(e) = provider.load() {
        log::error!("Model {} unavailable: {}", config.model.path, e);
    }

    let pipeline = InferencePipeline::new(provider, &config);
    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {}", bind_address);

    let config = web::Data::new(config);
    let pipeline = web::Data::new(pipeline);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(config.clone())
            .app_data(pipeline.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
