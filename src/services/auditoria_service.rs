//! services/auditoria_service.rs
//! Registro de auditoría. Las escrituras de register/actualizarEmpresa
//! insertan su fila dentro de la misma transacción que el cambio.

use anyhow::{Context, Result};
use sqlx::{Executor, PgPool, Postgres, Transaction};

use crate::models::auditoria_model::{
    Auditoria, AuditoriaRow, NuevaAuditoria, AUDITORIA_COLUMNS,
};

pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug)]
pub struct AuditoriaService {
    db_pool: PgPool,
}

impl AuditoriaService {
    pub fn new(db_pool: PgPool) -> Self {
        AuditoriaService { db_pool }
    }

    /// Inserta dentro de la transacción del llamador.
    pub async fn registrar_en_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        entrada: &NuevaAuditoria,
    ) -> Result<i64> {
        insertar(&mut **tx, entrada).await
    }

    /// Inserta fuera de transacción (login, logout, etc.).
    pub async fn registrar(&self, entrada: &NuevaAuditoria) -> Result<i64> {
        insertar(&self.db_pool, entrada).await
    }

    /// Igual que `registrar`, pero un fallo solo se loguea.
    pub async fn registrar_sin_fallar(&self, entrada: &NuevaAuditoria) {
        if let Err(e) = self.registrar(entrada).await {
            log::error!(
                "(auditoria) No se pudo registrar {} {}: {:?}",
                entrada.accion,
                entrada.tabla,
                e
            );
        }
    }

    pub async fn listar_por_usuario(
        &self,
        usuario_id: i32,
        limit: i32,
        offset: i32,
    ) -> Result<Vec<Auditoria>> {
        let (limit, offset) = clamp_page(limit, offset);
        let sql = format!(
            "SELECT {} FROM auditoria WHERE usuario_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
            AUDITORIA_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditoriaRow>(&sql)
            .bind(usuario_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al listar auditoría del usuario")?;

        Ok(rows.into_iter().map(Auditoria::from).collect())
    }

    pub async fn listar_todo(&self, limit: i32, offset: i32) -> Result<Vec<Auditoria>> {
        let (limit, offset) = clamp_page(limit, offset);
        let sql = format!(
            "SELECT {} FROM auditoria ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
            AUDITORIA_COLUMNS
        );
        let rows = sqlx::query_as::<_, AuditoriaRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al listar auditoría")?;

        Ok(rows.into_iter().map(Auditoria::from).collect())
    }
}

async fn insertar<'e, E>(executor: E, entrada: &NuevaAuditoria) -> Result<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO auditoria (usuario_id, accion, tabla, registro_id, detalle, ip)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(entrada.usuario_id)
    .bind(entrada.accion)
    .bind(entrada.tabla)
    .bind(entrada.registro_id)
    .bind(&entrada.detalle)
    .bind(&entrada.ip)
    .fetch_one(executor)
    .await
    .with_context(|| format!("Fallo al insertar auditoría {} {}", entrada.accion, entrada.tabla))?;

    Ok(id)
}

/// `limit` queda en 1..=100 y `offset` no negativo.
pub fn clamp_page(limit: i32, offset: i32) -> (i64, i64) {
    let limit = (limit as i64).clamp(1, MAX_PAGE_SIZE);
    let offset = (offset as i64).max(0);
    (limit, offset)
}
