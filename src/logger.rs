//! logger.rs
//! Configuración del logger usando env_logger.

/// Inicializa env_logger. Usa `RUST_LOG` si existe; si no, nivel `info`
/// para la API y `warn` para sqlx (que loguea cada sentencia en `info`).
pub fn init_logger() {
    let log_env =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sqlx=warn".to_string());

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_env))
        .format_timestamp_secs()
        .init();
}
