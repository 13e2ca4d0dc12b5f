use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use planet_backend::classifier::{PlanetAnalytics, TorchModel};
use planet_backend::config::AppConfig;
use planet_backend::routes::configure_routes;
use std::env;
use std::sync::Arc;

fn startup_error(msg: String) -> std::io::Error {
    log::error!("{}", msg);
    std::io::Error::new(std::io::ErrorKind::Other, msg)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let config = AppConfig::load().map_err(|e| startup_error(format!("Config loading failed: {}", e)))?;
    let classifier_config = config.services.planet_classifier.clone();

    let model = TorchModel::load(&classifier_config.model_path, &classifier_config.device)
        .map_err(|e| startup_error(format!("Model loading failed: {}", e)))?;
    log::info!(
        "Planet classifier ready: {} classes, input {}x{}, device {:?}",
        classifier_config.classes.len(),
        classifier_config.input_size.width,
        classifier_config.input_size.height,
        model.device()
    );

    let analytics = PlanetAnalytics::new(classifier_config, Arc::new(model));

    let bind_address = config.bind_address();
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
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
            .app_data(web::Data::new(analytics.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
