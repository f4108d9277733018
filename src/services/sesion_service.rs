//! services/sesion_service.rs
//! Sesiones de login. Cada refresh token apunta a una fila de `sesion`.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::sesion_model::{Sesion, SESION_COLUMNS};

#[derive(Clone, Debug)]
pub struct SesionService {
    db_pool: PgPool,
}

impl SesionService {
    pub fn new(db_pool: PgPool) -> Self {
        SesionService { db_pool }
    }

    pub async fn abrir(
        &self,
        usuario_id: i32,
        ip: Option<&str>,
        user_agent: Option<&str>,
        ttl: Duration,
    ) -> Result<Sesion> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| anyhow!("Duración de sesión fuera de rango: {:?}", ttl))?;

        let sql = format!(
            "INSERT INTO sesion (usuario_id, ip, user_agent, expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            SESION_COLUMNS
        );
        let sesion = sqlx::query_as::<_, Sesion>(&sql)
            .bind(usuario_id)
            .bind(ip)
            .bind(user_agent)
            .bind(expires_at)
            .fetch_one(&self.db_pool)
            .await
            .context("Fallo al abrir sesión")?;

        log::info!(
            "(sesion) Sesión {} abierta para usuario {} (expira {})",
            sesion.id,
            usuario_id,
            sesion.expires_at
        );
        Ok(sesion)
    }

    /// Cierra la sesión solo si sigue activa y vigente. Devuelve `false` si
    /// ya estaba cerrada, expirada o no pertenece al usuario, de modo que
    /// un mismo refresh token no se puede usar dos veces.
    pub async fn consumir(&self, sesion_id: i32, usuario_id: i32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sesion
            SET cerrada_at = NOW()
            WHERE id = $1
              AND usuario_id = $2
              AND cerrada_at IS NULL
              AND expires_at > NOW()
            "#,
        )
        .bind(sesion_id)
        .bind(usuario_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al consumir sesión")?;

        Ok(result.rows_affected() == 1)
    }

    /// Cierra la sesión aunque haya expirado. `false` si ya estaba cerrada.
    pub async fn cerrar(&self, sesion_id: i32, usuario_id: i32) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sesion SET cerrada_at = NOW() \
             WHERE id = $1 AND usuario_id = $2 AND cerrada_at IS NULL",
        )
        .bind(sesion_id)
        .bind(usuario_id)
        .execute(&self.db_pool)
        .await
        .context("Fallo al cerrar sesión")?;

        Ok(result.rows_affected() == 1)
    }

    /// Cierra todas las sesiones abiertas dentro de la transacción del
    /// llamador.
    pub async fn cerrar_todas(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usuario_id: i32,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE sesion SET cerrada_at = NOW() WHERE usuario_id = $1 AND cerrada_at IS NULL",
        )
        .bind(usuario_id)
        .execute(&mut **tx)
        .await
        .context("Fallo al cerrar sesiones del usuario")?;

        Ok(result.rows_affected())
    }
}
