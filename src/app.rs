//! app.rs
use crate::handlers::{graphql_handler, health_handler};
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_handler::health_endpoint))
        .service(
            web::resource("/graphql").route(web::post().to(graphql_handler::graphql_endpoint)),
        );
}
