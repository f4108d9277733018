//! tests/mod.rs
//! Pruebas unitarias y de integración HTTP/GraphQL. Salvo `db_tests`,
//! ninguna necesita una base de datos: el pool es lazy y los casos
//! cubiertos fallan antes de la primera consulta.

mod db_tests;
mod error_tests;

use chrono::Utc;

use crate::config::app_config::{AuthConfig, DatabaseConfig};
use crate::db::lazy_pool;
use crate::models::usuario_model::{RegisterInput, TipoUsuario, Usuario};
use crate::services::AppServices;

pub(crate) const TEST_SECRET: &str = "viasuc-test-secret";
pub(crate) const TEST_REFRESH_SECRET: &str = "viasuc-test-refresh-secret";

pub(crate) fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::with_secret(TEST_SECRET);
    config.jwt_refresh_secret = TEST_REFRESH_SECRET.to_string();
    config.bcrypt_cost = 4;
    config
}

/// Servicios sobre un pool que nunca llega a conectarse.
/// Debe llamarse dentro de un runtime (sqlx agenda tareas de mantención).
pub(crate) fn test_services() -> AppServices {
    let db = DatabaseConfig {
        ssl: false,
        ..DatabaseConfig::default()
    };
    AppServices::new(lazy_pool(&db), &test_auth_config())
}

pub(crate) fn usuario_de_prueba(id: i32, tipo: TipoUsuario) -> Usuario {
    let now = Utc::now();
    Usuario {
        id,
        email: format!("usuario{}@viasuc.cl", id),
        nombre: "Ana".to_string(),
        apellido: "Pérez".to_string(),
        tipo,
        telefono: None,
        activo: true,
        ultimo_acceso: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn register_input(tipo: TipoUsuario) -> RegisterInput {
    RegisterInput {
        email: "  Ana.Perez@Empresa.CL ".to_string(),
        password: "secreto123".to_string(),
        nombre: " Ana ".to_string(),
        apellido: "Pérez".to_string(),
        tipo,
        telefono: None,
        cargo: None,
        empresa: None,
        carrera: None,
        semestre: None,
        anio_egreso: None,
    }
}
