use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use pcos_backend::routes::{UploadLimit, configure_routes};
use pcos_backend::{AppConfig, Registry};

fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    if let Ok(current_dir) = std::env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    }

    // Built before the runtime starts: the caption client is blocking.
    let registry = web::Data::new(Registry::load(&config));
    let bind_address = config.bind_address();
    let body_limit = config.server.body_limit();

    actix_web::rt::System::new().block_on(async move {
        log::info!("Starting server on {}", bind_address);
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
                .app_data(registry.clone())
                .app_data(web::JsonConfig::default().limit(body_limit))
                .app_data(web::Data::new(UploadLimit(body_limit)))
                .configure(configure_routes)
        })
        .bind(&bind_address)?
        .run()
        .await
    })
}
