//! services/usuario_service.rs
//! Registro, login, refresh/logout y datos del usuario autenticado.

use anyhow::Context;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    auth::{
        context::RequestContext,
        password::{hash_password, verify_password},
        token::TokenService,
    },
    errors::{ApiError, ApiResult},
    models::{
        auditoria_model::{acciones, NuevaAuditoria},
        auth_model::AuthPayload,
        empresa_model::{Empresa, RegistroEmpresaInput, EMPRESA_COLUMNS},
        usuario_model::{
            RegisterInput, TipoUsuario, Usuario, UsuarioConPassword, UsuarioRow, USUARIO_COLUMNS,
        },
    },
    services::{
        auditoria_service::AuditoriaService, empresa_service::EmpresaService,
        sesion_service::SesionService,
    },
    validation::{normalize_email, validate_email, validate_password, validate_register_input},
};

#[derive(Clone)]
pub struct UsuarioService {
    db_pool: PgPool,
    tokens: TokenService,
    auditoria: AuditoriaService,
    sesiones: SesionService,
    empresas: EmpresaService,
    bcrypt_cost: u32,
}

impl UsuarioService {
    pub fn new(
        db_pool: PgPool,
        tokens: TokenService,
        auditoria: AuditoriaService,
        sesiones: SesionService,
        empresas: EmpresaService,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            db_pool,
            tokens,
            auditoria,
            sesiones,
            empresas,
            bcrypt_cost,
        }
    }

    // ======================================================
    // Registro
    // ======================================================

    /// Registra un usuario y, según su tipo, su empresa o su perfil de
    /// alumno/egresado. Todo ocurre en una transacción: si un paso falla no
    /// queda nada persistido.
    pub async fn register(
        &self,
        mut input: RegisterInput,
        ctx: &RequestContext,
    ) -> ApiResult<AuthPayload> {
        validate_register_input(&mut input)?;
        log::info!(
            "(register) Registrando usuario email={} tipo={}",
            input.email,
            input.tipo
        );

        // El hash se calcula antes de tomar una conexión del pool.
        let password_hash = hash_password(&input.password, self.bcrypt_cost).await?;

        let mut tx = self
            .db_pool
            .begin()
            .await
            .context("No se pudo iniciar la transacción de registro")?;

        let resultado = self
            .register_en_tx(&mut tx, &input, &password_hash, ctx)
            .await;
        let (usuario, empresa) = match resultado {
            Ok(creado) => {
                tx.commit().await.context("Fallo al confirmar el registro")?;
                creado
            }
            Err(e) => {
                log::warn!(
                    "(register) Rollback del registro email={}: {}",
                    input.email,
                    e
                );
                if let Err(rb) = tx.rollback().await {
                    log::error!("(register) Fallo el rollback: {:?}", rb);
                }
                return Err(e);
            }
        };

        log::info!(
            "(register) Usuario {} registrado (empresa={:?})",
            usuario.id,
            empresa.as_ref().map(|e| e.id)
        );
        self.emitir_payload(usuario, empresa, ctx).await
    }

    async fn register_en_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        input: &RegisterInput,
        password_hash: &str,
        ctx: &RequestContext,
    ) -> ApiResult<(Usuario, Option<Empresa>)> {
        // 1) Email único
        let existente: Option<i32> =
            sqlx::query_scalar("SELECT id FROM usuarios WHERE email = $1")
                .bind(&input.email)
                .fetch_optional(&mut **tx)
                .await?;
        if existente.is_some() {
            return Err(ApiError::EmailAlreadyExists);
        }

        // 2) Usuario
        let sql = format!(
            "INSERT INTO usuarios (email, password, nombre, apellido, tipo, telefono) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USUARIO_COLUMNS
        );
        let row = sqlx::query_as::<_, UsuarioRow>(&sql)
            .bind(&input.email)
            .bind(password_hash)
            .bind(&input.nombre)
            .bind(&input.apellido)
            .bind(input.tipo.as_str())
            .bind(input.telefono.as_deref().map(str::trim))
            .fetch_one(&mut **tx)
            .await?;
        let usuario = Usuario::try_from(row)?;

        let entrada = NuevaAuditoria::new(acciones::CREATE, "usuarios")
            .usuario(usuario.id)
            .registro(usuario.id)
            .ip(ctx.ip.as_deref())
            .detalle(json!({ "email": usuario.email, "tipo": usuario.tipo.as_str() }));
        self.auditoria.registrar_en_tx(tx, &entrada).await?;

        // 3) Datos según tipo
        let empresa = match input.tipo {
            TipoUsuario::Empleador => {
                let datos = input.empresa.as_ref().ok_or_else(|| {
                    ApiError::bad_input("Un empleador debe registrarse con los datos de su empresa")
                })?;
                let empresa = self
                    .vincular_empresa(tx, &usuario, datos, input.cargo.as_deref(), ctx)
                    .await?;
                Some(empresa)
            }
            TipoUsuario::Alumno => {
                let perfil_id: i32 = sqlx::query_scalar(
                    "INSERT INTO alumnos (usuario_id, carrera, semestre) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(usuario.id)
                .bind(input.carrera.as_deref())
                .bind(input.semestre)
                .fetch_one(&mut **tx)
                .await
                .context("Fallo al insertar alumno")?;

                let entrada = NuevaAuditoria::new(acciones::CREATE, "alumnos")
                    .usuario(usuario.id)
                    .registro(perfil_id)
                    .ip(ctx.ip.as_deref());
                self.auditoria.registrar_en_tx(tx, &entrada).await?;
                None
            }
            TipoUsuario::Egresado => {
                let perfil_id: i32 = sqlx::query_scalar(
                    "INSERT INTO egresados (usuario_id, carrera, anio_egreso) VALUES ($1, $2, $3) RETURNING id",
                )
                .bind(usuario.id)
                .bind(input.carrera.as_deref())
                .bind(input.anio_egreso)
                .fetch_one(&mut **tx)
                .await
                .context("Fallo al insertar egresado")?;

                let entrada = NuevaAuditoria::new(acciones::CREATE, "egresados")
                    .usuario(usuario.id)
                    .registro(perfil_id)
                    .ip(ctx.ip.as_deref());
                self.auditoria.registrar_en_tx(tx, &entrada).await?;
                None
            }
            TipoUsuario::Admin => {
                return Err(ApiError::bad_input(
                    "No se permite registrar usuarios administradores",
                ))
            }
        };

        Ok((usuario, empresa))
    }

    /// Crea la empresa si su RUT no existe y la vincula al usuario. Quien
    /// crea la empresa queda como su administrador.
    async fn vincular_empresa(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usuario: &Usuario,
        datos: &RegistroEmpresaInput,
        cargo: Option<&str>,
        ctx: &RequestContext,
    ) -> ApiResult<Empresa> {
        let sql = format!(
            r#"
            INSERT INTO empresas (
                rut, razon_social, nombre_fantasia, giro, direccion, comuna,
                region, telefono, email_contacto, sitio_web, descripcion
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (rut) DO NOTHING
            RETURNING {}
            "#,
            EMPRESA_COLUMNS
        );
        let creada = sqlx::query_as::<_, Empresa>(&sql)
            .bind(&datos.rut)
            .bind(&datos.razon_social)
            .bind(datos.nombre_fantasia.as_deref())
            .bind(datos.giro.as_deref())
            .bind(datos.direccion.as_deref())
            .bind(datos.comuna.as_deref())
            .bind(datos.region.as_deref())
            .bind(datos.telefono.as_deref())
            .bind(datos.email_contacto.as_deref())
            .bind(datos.sitio_web.as_deref())
            .bind(datos.descripcion.as_deref())
            .fetch_optional(&mut **tx)
            .await
            .context("Fallo al insertar empresa")?;

        let (empresa, es_admin) = match creada {
            Some(empresa) => {
                log::info!(
                    "(register) Empresa {} creada con RUT {}",
                    empresa.id,
                    empresa.rut
                );
                let entrada = NuevaAuditoria::new(acciones::CREATE, "empresas")
                    .usuario(usuario.id)
                    .registro(empresa.id)
                    .ip(ctx.ip.as_deref())
                    .detalle(json!({ "rut": empresa.rut, "razon_social": empresa.razon_social }));
                self.auditoria.registrar_en_tx(tx, &entrada).await?;
                (empresa, true)
            }
            None => {
                let sql = format!("SELECT {} FROM empresas WHERE rut = $1", EMPRESA_COLUMNS);
                let empresa = sqlx::query_as::<_, Empresa>(&sql)
                    .bind(&datos.rut)
                    .fetch_one(&mut **tx)
                    .await
                    .context("Fallo al buscar empresa existente por RUT")?;
                log::info!(
                    "(register) RUT {} ya registrado, se vincula a empresa {}",
                    empresa.rut,
                    empresa.id
                );
                (empresa, false)
            }
        };

        sqlx::query(
            "INSERT INTO empresa_usuario (empresa_id, usuario_id, cargo, es_admin) VALUES ($1, $2, $3, $4)",
        )
        .bind(empresa.id)
        .bind(usuario.id)
        .bind(cargo.map(str::trim))
        .bind(es_admin)
        .execute(&mut **tx)
        .await
        .context("Fallo al vincular empresa_usuario")?;

        let entrada = NuevaAuditoria::new(acciones::LINK, "empresa_usuario")
            .usuario(usuario.id)
            .registro(empresa.id)
            .ip(ctx.ip.as_deref())
            .detalle(json!({ "usuario_id": usuario.id, "es_admin": es_admin }));
        self.auditoria.registrar_en_tx(tx, &entrada).await?;

        Ok(empresa)
    }

    // ======================================================
    // Login / tokens
    // ======================================================

    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ctx: &RequestContext,
    ) -> ApiResult<AuthPayload> {
        let email = normalize_email(email);
        validate_email(&email)?;
        if password.is_empty() {
            return Err(ApiError::bad_input("La contraseña es obligatoria"));
        }

        let sql = format!(
            "SELECT {}, password FROM usuarios WHERE email = $1",
            USUARIO_COLUMNS
        );
        let fila = sqlx::query_as::<_, UsuarioConPassword>(&sql)
            .bind(&email)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al buscar usuario por email")?;

        let Some(fila) = fila else {
            log::warn!("(login) Email no registrado: {}", email);
            return Err(ApiError::UserNotFound);
        };
        let usuario_id = fila.usuario.id;

        if !fila.usuario.activo {
            log::warn!("(login) Usuario {} inactivo", usuario_id);
            return Err(ApiError::UserInactive);
        }

        if !verify_password(password, &fila.password).await? {
            log::warn!("(login) Contraseña incorrecta para usuario {}", usuario_id);
            let entrada = NuevaAuditoria::new(acciones::LOGIN_FAILED, "usuarios")
                .usuario(usuario_id)
                .registro(usuario_id)
                .ip(ctx.ip.as_deref());
            self.auditoria.registrar_sin_fallar(&entrada).await;
            return Err(ApiError::InvalidCredentials);
        }

        let sql = format!(
            "UPDATE usuarios SET ultimo_acceso = NOW() WHERE id = $1 RETURNING {}",
            USUARIO_COLUMNS
        );
        let row = sqlx::query_as::<_, UsuarioRow>(&sql)
            .bind(usuario_id)
            .fetch_one(&self.db_pool)
            .await
            .context("Fallo al actualizar ultimo_acceso")?;
        let usuario = Usuario::try_from(row)?;

        let entrada = NuevaAuditoria::new(acciones::LOGIN, "usuarios")
            .usuario(usuario.id)
            .registro(usuario.id)
            .ip(ctx.ip.as_deref())
            .detalle(json!({ "user_agent": ctx.user_agent }));
        self.auditoria.registrar_sin_fallar(&entrada).await;

        log::info!("(login) Usuario {} autenticado", usuario.id);
        let empresa = self.empresa_de(&usuario).await?;
        self.emitir_payload(usuario, empresa, ctx).await
    }

    /// Cambia un refresh token vigente por un par nuevo. La sesión anterior
    /// se consume, así que el token viejo deja de servir.
    pub async fn refresh(&self, refresh_token: &str, ctx: &RequestContext) -> ApiResult<AuthPayload> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        if !self.sesiones.consumir(claims.sid, claims.id).await? {
            log::warn!(
                "(refresh) Sesión {} de usuario {} cerrada o expirada",
                claims.sid,
                claims.id
            );
            return Err(ApiError::InvalidToken);
        }

        let usuario = self
            .buscar_por_id(claims.id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        if !usuario.activo {
            return Err(ApiError::UserInactive);
        }

        let empresa = self.empresa_de(&usuario).await?;
        self.emitir_payload(usuario, empresa, ctx).await
    }

    /// Cierra la sesión del refresh token. Idempotente.
    pub async fn logout(&self, refresh_token: &str, ctx: &RequestContext) -> ApiResult<bool> {
        let claims = self.tokens.verify_refresh_token(refresh_token)?;

        if let Some(actual) = &ctx.usuario {
            if actual.id != claims.id {
                return Err(ApiError::Forbidden(
                    "El refresh token pertenece a otro usuario".to_string(),
                ));
            }
        }

        if self.sesiones.cerrar(claims.sid, claims.id).await? {
            let entrada = NuevaAuditoria::new(acciones::LOGOUT, "sesion")
                .usuario(claims.id)
                .registro(claims.sid)
                .ip(ctx.ip.as_deref());
            self.auditoria.registrar_sin_fallar(&entrada).await;
            log::info!("(logout) Sesión {} cerrada", claims.sid);
        }
        Ok(true)
    }

    async fn emitir_payload(
        &self,
        usuario: Usuario,
        empresa: Option<Empresa>,
        ctx: &RequestContext,
    ) -> ApiResult<AuthPayload> {
        let sesion = self
            .sesiones
            .abrir(
                usuario.id,
                ctx.ip.as_deref(),
                ctx.user_agent.as_deref(),
                self.tokens.refresh_ttl(),
            )
            .await?;

        let token = self.tokens.issue_access_token(&usuario)?;
        let refresh_token = self.tokens.issue_refresh_token(usuario.id, sesion.id)?;

        Ok(AuthPayload {
            token,
            refresh_token,
            expires_in: i64::try_from(self.tokens.access_ttl().as_secs())
                .context("Duración de access token fuera de rango")?,
            usuario,
            empresa,
        })
    }

    async fn empresa_de(&self, usuario: &Usuario) -> ApiResult<Option<Empresa>> {
        if usuario.tipo == TipoUsuario::Empleador {
            self.empresas.principal_de(usuario.id).await
        } else {
            Ok(None)
        }
    }

    // ======================================================
    // Usuario autenticado
    // ======================================================

    pub async fn buscar_por_id(&self, usuario_id: i32) -> ApiResult<Option<Usuario>> {
        let sql = format!("SELECT {} FROM usuarios WHERE id = $1", USUARIO_COLUMNS);
        let row = sqlx::query_as::<_, UsuarioRow>(&sql)
            .bind(usuario_id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al buscar usuario")?;

        match row {
            Some(row) => Ok(Some(Usuario::try_from(row)?)),
            None => Ok(None),
        }
    }

    pub async fn me(&self, ctx: &RequestContext) -> ApiResult<Usuario> {
        let claims = ctx.require_user()?;
        self.buscar_por_id(claims.id)
            .await?
            .ok_or(ApiError::UserNotFound)
    }

    /// Cambia la contraseña y cierra todas las sesiones del usuario.
    pub async fn cambiar_password(
        &self,
        actual: &str,
        nueva: &str,
        ctx: &RequestContext,
    ) -> ApiResult<bool> {
        let claims = ctx.require_user()?;
        validate_password(nueva)?;
        if actual == nueva {
            return Err(ApiError::bad_input(
                "La nueva contraseña debe ser distinta de la actual",
            ));
        }

        let hash_actual = sqlx::query_scalar::<_, String>("SELECT password FROM usuarios WHERE id = $1")
            .bind(claims.id)
            .fetch_optional(&self.db_pool)
            .await
            .context("Fallo al leer contraseña actual")?
            .ok_or(ApiError::UserNotFound)?;

        if !verify_password(actual, &hash_actual).await? {
            return Err(ApiError::InvalidCredentials);
        }

        let nuevo_hash = hash_password(nueva, self.bcrypt_cost).await?;

        let mut tx = self
            .db_pool
            .begin()
            .await
            .context("No se pudo iniciar la transacción de cambio de contraseña")?;
        let resultado = self
            .cambiar_password_en_tx(&mut tx, claims.id, &nuevo_hash, ctx)
            .await;
        let cerradas = match resultado {
            Ok(cerradas) => {
                tx.commit()
                    .await
                    .context("Fallo al confirmar cambio de contraseña")?;
                cerradas
            }
            Err(e) => {
                log::warn!(
                    "(cambiar_password) Rollback para usuario {}: {}",
                    claims.id,
                    e
                );
                if let Err(rb) = tx.rollback().await {
                    log::error!("(cambiar_password) Fallo el rollback: {:?}", rb);
                }
                return Err(e);
            }
        };

        log::info!(
            "(cambiar_password) Usuario {} cambió su contraseña; {} sesiones cerradas",
            claims.id,
            cerradas
        );
        Ok(true)
    }

    /// Nuevo hash, cierre de sesiones y auditoría en una sola transacción.
    async fn cambiar_password_en_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        usuario_id: i32,
        nuevo_hash: &str,
        ctx: &RequestContext,
    ) -> ApiResult<u64> {
        sqlx::query("UPDATE usuarios SET password = $2, updated_at = NOW() WHERE id = $1")
            .bind(usuario_id)
            .bind(nuevo_hash)
            .execute(&mut **tx)
            .await
            .context("Fallo al actualizar contraseña")?;

        let cerradas = self.sesiones.cerrar_todas(tx, usuario_id).await?;

        let entrada = NuevaAuditoria::new(acciones::UPDATE_PASSWORD, "usuarios")
            .usuario(usuario_id)
            .registro(usuario_id)
            .ip(ctx.ip.as_deref())
            .detalle(json!({ "sesiones_cerradas": cerradas }));
        self.auditoria.registrar_en_tx(tx, &entrada).await?;

        Ok(cerradas)
    }
}
