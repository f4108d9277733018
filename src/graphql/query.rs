//! graphql/query.rs
use async_graphql::{Context, Object, Result, ResultExt};

use crate::{
    errors::ApiError,
    graphql::request_context,
    models::{
        auditoria_model::Auditoria,
        empresa_model::{Empresa, EmpresaDeUsuario},
        usuario_model::{TipoUsuario, Usuario},
    },
    services::{
        auditoria_service::AuditoriaService, empresa_service::EmpresaService,
        usuario_service::UsuarioService,
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Usuario autenticado.
    async fn me(&self, ctx: &Context<'_>) -> Result<Usuario> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>().me(&req).await.extend()
    }

    /// Empresas a las que está vinculado el usuario autenticado.
    async fn mis_empresas(&self, ctx: &Context<'_>) -> Result<Vec<EmpresaDeUsuario>> {
        let req = request_context(ctx);
        let claims = req.require_user().extend()?;
        ctx.data_unchecked::<EmpresaService>()
            .listar_por_usuario(claims.id)
            .await
            .extend()
    }

    async fn empresa(&self, ctx: &Context<'_>, id: i32) -> Result<Empresa> {
        let req = request_context(ctx);
        ctx.data_unchecked::<EmpresaService>()
            .obtener(id, &req)
            .await
            .extend()
    }

    /// Auditoría de las acciones del usuario autenticado.
    async fn mi_auditoria(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i32,
        #[graphql(default = 0)] offset: i32,
    ) -> Result<Vec<Auditoria>> {
        let req = request_context(ctx);
        let claims = req.require_user().extend()?;
        ctx.data_unchecked::<AuditoriaService>()
            .listar_por_usuario(claims.id, limit, offset)
            .await
            .map_err(ApiError::from)
            .extend()
    }

    /// Auditoría completa (solo admin).
    async fn auditoria(
        &self,
        ctx: &Context<'_>,
        #[graphql(default = 20)] limit: i32,
        #[graphql(default = 0)] offset: i32,
    ) -> Result<Vec<Auditoria>> {
        let req = request_context(ctx);
        req.require_tipo(&[TipoUsuario::Admin]).extend()?;
        ctx.data_unchecked::<AuditoriaService>()
            .listar_todo(limit, offset)
            .await
            .map_err(ApiError::from)
            .extend()
    }
}
