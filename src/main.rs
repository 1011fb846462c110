// src/main.rs

mod app_state;
mod auth;
mod authorization;
mod config;
mod error;
mod lists;
mod models;
mod routes;
mod storage;
mod tasks;
mod validation;

use std::io;

use actix_cors::Cors;
use actix_web::{http, middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info};

use crate::app_state::AppState;
use crate::auth::Authentication;
use crate::config::Config;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;
    let storage = storage::connect(&config).await.map_err(|e| {
        error!("Could not open storage: {}", e);
        io::Error::other(e)
    })?;

    let state = AppState {
        storage,
        config: config.clone(),
    };
    let bind_address = config.bind_address.clone();

    info!("Server running at http://{}", bind_address);
    info!("Allowed CORS Origin: {}", config.frontend_origin);
    if !config.strict_task_ownership {
        info!("Task updates and deletes skip the parent list ownership check");
    }

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure)
    })
    .bind(bind_address)?
    .run()
    .await
}
