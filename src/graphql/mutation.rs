//! graphql/mutation.rs
use async_graphql::{Context, Object, Result, ResultExt};

use crate::{
    graphql::request_context,
    models::{
        auth_model::AuthPayload,
        empresa_model::{ActualizarEmpresaInput, Empresa},
        usuario_model::RegisterInput,
    },
    services::{empresa_service::EmpresaService, usuario_service::UsuarioService},
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Crea la cuenta (y la empresa o el perfil según el tipo) y devuelve
    /// los tokens de la nueva sesión.
    async fn register(&self, ctx: &Context<'_>, input: RegisterInput) -> Result<AuthPayload> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>()
            .register(input, &req)
            .await
            .extend()
    }

    async fn login(&self, ctx: &Context<'_>, email: String, password: String) -> Result<AuthPayload> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>()
            .login(&email, &password, &req)
            .await
            .extend()
    }

    async fn refresh_token(&self, ctx: &Context<'_>, refresh_token: String) -> Result<AuthPayload> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>()
            .refresh(&refresh_token, &req)
            .await
            .extend()
    }

    async fn logout(&self, ctx: &Context<'_>, refresh_token: String) -> Result<bool> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>()
            .logout(&refresh_token, &req)
            .await
            .extend()
    }

    async fn cambiar_password(&self, ctx: &Context<'_>, actual: String, nueva: String) -> Result<bool> {
        let req = request_context(ctx);
        ctx.data_unchecked::<UsuarioService>()
            .cambiar_password(&actual, &nueva, &req)
            .await
            .extend()
    }

    async fn actualizar_empresa(
        &self,
        ctx: &Context<'_>,
        id: i32,
        input: ActualizarEmpresaInput,
    ) -> Result<Empresa> {
        let req = request_context(ctx);
        ctx.data_unchecked::<EmpresaService>()
            .actualizar(id, input, &req)
            .await
            .extend()
    }
}
