//! handlers/mod.rs
//! Endpoints HTTP.
pub mod graphql_handler;
pub mod health_handler;
