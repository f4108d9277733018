use actix_web::{web, App, HttpServer};
use anyhow::Context;
use dotenv::dotenv;

use crate::config::app_config::AppConfig;
use crate::db::{run_migrations, setup_database};
use crate::graphql::build_schema;
use crate::logger::init_logger;
use crate::services::AppServices;

mod app;
mod auth;
mod config;
mod db;
mod errors;
mod graphql;
mod handlers;
mod logger;
mod models;
mod services;
mod validation;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    let config = AppConfig::from_env().context("Configuración inválida")?;

    // Conectarnos a la DB
    let db_pool = setup_database(&config.database).await?;
    run_migrations(&db_pool).await?;

    let services = AppServices::new(db_pool, &config.auth);
    let schema = build_schema(&services);
    let tokens = services.tokens.clone();
    let server_config = config.server.clone();

    // Levantar servidor
    let (host, port) = (config.server.host.clone(), config.server.port);
    log::info!(
        "Levantando servidor en {}:{} ({} workers)",
        host,
        port,
        config.server.workers
    );
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(schema.clone()))
            .app_data(web::Data::new(tokens.clone()))
            .app_data(web::Data::new(server_config.clone()))
            .configure(app::init_app)
    })
    .workers(config.server.workers)
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
