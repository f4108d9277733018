//! services/empresa_service.rs
//! Consulta y actualización de empresas vinculadas a usuarios.

use anyhow::Context;
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    auth::context::RequestContext,
    errors::{ApiError, ApiResult},
    models::{
        auditoria_model::{acciones, NuevaAuditoria},
        empresa_model::{ActualizarEmpresaInput, CampoEmpresa, Empresa, EmpresaDeUsuario, EMPRESA_COLUMNS},
    },
    services::auditoria_service::AuditoriaService,
};

#[derive(Clone, Debug)]
pub struct EmpresaService {
    db_pool: PgPool,
    auditoria: AuditoriaService,
}

/// Columnas de `empresas` con alias `e.` para los JOIN.
fn empresa_columns_prefixed() -> String {
    EMPRESA_COLUMNS
        .split(',')
        .map(|c| format!("e.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

impl EmpresaService {
    pub fn new(db_pool: PgPool, auditoria: AuditoriaService) -> Self {
        EmpresaService { db_pool, auditoria }
    }

    pub async fn listar_por_usuario(&self, usuario_id: i32) -> ApiResult<Vec<EmpresaDeUsuario>> {
        let sql = format!(
            r#"
            SELECT {}, eu.cargo, eu.es_admin
            FROM empresas e
            JOIN empresa_usuario eu ON eu.empresa_id = e.id
            WHERE eu.usuario_id = $1
            ORDER BY eu.created_at, e.id
            "#,
            empresa_columns_prefixed()
        );
        let rows = sqlx::query_as::<_, EmpresaDeUsuario>(&sql)
            .bind(usuario_id)
            .fetch_all(&self.db_pool)
            .await
            .context("Fallo al listar empresas del usuario")?;
        Ok(rows)
    }

    /// Primera empresa a la que se vinculó el usuario.
    pub async fn principal_de(&self, usuario_id: i32) -> ApiResult<Option<Empresa>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM empresas e
            JOIN empresa_usuario eu ON eu.empresa_id = e.id
            WHERE eu.usuario_id = $1
            ORDER BY eu.created_at, e.id
            LIMIT 1
            "#,
            empresa_columns_prefixed()
        );
        let empresa = sqlx::query_as::<_, Empresa>(&sql)
            .bind(usuario_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al buscar empresa principal")?;
        Ok(empresa)
    }

    /// La empresa solo es visible para sus miembros y para admins. Un no
    /// miembro recibe FORBIDDEN exista o no el id.
    pub async fn obtener(&self, empresa_id: i32, ctx: &RequestContext) -> ApiResult<Empresa> {
        let claims = ctx.require_user()?;

        if !ctx.is_admin() {
            let vinculo: Option<bool> = sqlx::query_scalar(
                "SELECT es_admin FROM empresa_usuario WHERE empresa_id = $1 AND usuario_id = $2",
            )
            .bind(empresa_id)
            .bind(claims.id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al verificar vínculo empresa_usuario")?;

            if vinculo.is_none() {
                return Err(ApiError::Forbidden(
                    "El usuario no pertenece a esta empresa".to_string(),
                ));
            }
        }

        let sql = format!("SELECT {} FROM empresas WHERE id = $1", EMPRESA_COLUMNS);
        let empresa = sqlx::query_as::<_, Empresa>(&sql)
            .bind(empresa_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al obtener empresa")?
            .ok_or(ApiError::EmpresaNotFound)?;

        Ok(empresa)
    }

    /// Actualiza la empresa en una sola transacción: bloqueo de la fila,
    /// verificación de permisos, UPDATE y auditoría. Cualquier fallo hace
    /// ROLLBACK.
    pub async fn actualizar(
        &self,
        empresa_id: i32,
        input: ActualizarEmpresaInput,
        ctx: &RequestContext,
    ) -> ApiResult<Empresa> {
        let claims = ctx.require_user()?;
        let campos = input.campos()?;

        log::info!(
            "(actualizar_empresa) Usuario {} actualiza empresa {} ({} campos)",
            claims.id,
            empresa_id,
            campos.len()
        );

        let mut tx = self
            .db_pool
            .begin()
            .await
            .context("No se pudo iniciar la transacción")?;

        let resultado = self.actualizar_en_tx(&mut tx, empresa_id, &campos, ctx).await;
        match resultado {
            Ok(empresa) => {
                tx.commit()
                    .await
                    .context("Fallo al confirmar actualización de empresa")?;
                log::info!("(actualizar_empresa) Empresa {} actualizada", empresa_id);
                Ok(empresa)
            }
            Err(e) => {
                log::warn!(
                    "(actualizar_empresa) Rollback de empresa {}: {}",
                    empresa_id,
                    e
                );
                if let Err(rb) = tx.rollback().await {
                    log::error!("(actualizar_empresa) Fallo el rollback: {:?}", rb);
                }
                Err(e)
            }
        }
    }

    async fn actualizar_en_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        empresa_id: i32,
        campos: &[CampoEmpresa],
        ctx: &RequestContext,
    ) -> ApiResult<Empresa> {
        let claims = ctx.require_user()?;

        // 1) Permisos: admin de la plataforma o admin de la empresa.
        //    Un no miembro recibe FORBIDDEN aunque el id no exista
        if !ctx.is_admin() {
            let es_admin: Option<bool> = sqlx::query_scalar(
                "SELECT es_admin FROM empresa_usuario WHERE empresa_id = $1 AND usuario_id = $2",
            )
            .bind(empresa_id)
            .bind(claims.id)
            .fetch_optional(&mut **tx)
            .await
            .context("Fallo al verificar vínculo empresa_usuario")?;

            match es_admin {
                None => {
                    return Err(ApiError::Forbidden(
                        "El usuario no pertenece a esta empresa".to_string(),
                    ))
                }
                Some(false) => {
                    return Err(ApiError::Forbidden(
                        "Solo un administrador de la empresa puede modificarla".to_string(),
                    ))
                }
                Some(true) => {}
            }
        }

        // 2) Bloquear la fila
        let sql = format!(
            "SELECT {} FROM empresas WHERE id = $1 FOR UPDATE",
            EMPRESA_COLUMNS
        );
        let anterior = sqlx::query_as::<_, Empresa>(&sql)
            .bind(empresa_id)
            .fetch_optional(&mut **tx)
            .await
            .context("Fallo al bloquear empresa")?
            .ok_or(ApiError::EmpresaNotFound)?;

        // 3) UPDATE con las columnas informadas ($1 es el id)
        let sql = build_update_sql(campos);
        let mut query = sqlx::query_as::<_, Empresa>(&sql).bind(empresa_id);
        for (_, valor) in campos {
            query = query.bind(valor.as_deref());
        }
        let actualizada = query
            .fetch_one(&mut **tx)
            .await
            .context("Fallo al actualizar empresa")?;

        // 4) Auditoría con el antes/después de cada campo
        let entrada = NuevaAuditoria::new(acciones::UPDATE, "empresas")
            .usuario(claims.id)
            .registro(empresa_id)
            .ip(ctx.ip.as_deref())
            .detalle(diff_campos(&anterior, campos));
        self.auditoria.registrar_en_tx(tx, &entrada).await?;

        Ok(actualizada)
    }
}

/// `UPDATE empresas SET col = $2, ... , updated_at = NOW() WHERE id = $1`.
/// Los nombres de columna vienen de una lista fija, nunca del cliente.
pub fn build_update_sql(campos: &[CampoEmpresa]) -> String {
    let sets = campos
        .iter()
        .enumerate()
        .map(|(i, (columna, _))| format!("{} = ${}", columna, i + 2))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "UPDATE empresas SET {}, updated_at = NOW() WHERE id = $1 RETURNING {}",
        sets, EMPRESA_COLUMNS
    )
}

/// `{"campos": {"giro": {"antes": .., "despues": ..}, ...}}`
pub fn diff_campos(anterior: &Empresa, campos: &[CampoEmpresa]) -> Value {
    let previo = serde_json::to_value(anterior).unwrap_or(Value::Null);
    let mut cambios = Map::new();
    for (columna, valor) in campos {
        let antes = previo.get(*columna).cloned().unwrap_or(Value::Null);
        cambios.insert(
            columna.to_string(),
            json!({ "antes": antes, "despues": valor }),
        );
    }
    json!({ "campos": cambios })
}
