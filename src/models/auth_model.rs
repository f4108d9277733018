//! models/auth_model.rs
use async_graphql::SimpleObject;

use crate::models::{empresa_model::Empresa, usuario_model::Usuario};

/// Respuesta de register/login/refreshToken.
#[derive(Debug, Clone, SimpleObject)]
pub struct AuthPayload {
    pub token: String,
    pub refresh_token: String,
    /// Vigencia del access token, en segundos.
    pub expires_in: i64,
    pub usuario: Usuario,
    /// Empresa principal cuando el usuario es empleador.
    pub empresa: Option<Empresa>,
}
