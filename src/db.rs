//! db.rs
//! Pool de conexiones a PostgreSQL y migraciones.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::app_config::DatabaseConfig;

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new().max_connections(config.max_connections)
}

/// Crea el pool y verifica que haya al menos una conexión válida.
pub async fn setup_database(config: &DatabaseConfig) -> Result<PgPool> {
    log::info!("Conectando a PostgreSQL en {}", config.display_target());

    let db_pool = pool_options(config)
        .connect_with(config.connect_options())
        .await
        .with_context(|| {
            format!(
                "No se pudo conectar a la base de datos {}",
                config.display_target()
            )
        })?;

    // Verificar la conexión
    let conn = db_pool.acquire().await.context("Falló la conexión")?;
    drop(conn);

    log::info!(
        "Pool de PostgreSQL listo (max_connections={})",
        config.max_connections
    );
    Ok(db_pool)
}

/// Pool que no abre conexiones hasta el primer uso.
pub fn lazy_pool(config: &DatabaseConfig) -> PgPool {
    pool_options(config).connect_lazy_with(config.connect_options())
}

/// Corre migraciones con sqlx
pub async fn run_migrations(db_pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(db_pool)
        .await
        .context("Fallo al correr migraciones")?;
    Ok(())
}
