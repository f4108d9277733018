//! auth/context.rs
//! Contexto de cada request GraphQL: usuario autenticado (si lo hay), IP y
//! User-Agent.

use crate::auth::token::{AccessClaims, TokenService};
use crate::errors::{ApiError, ApiResult};
use crate::models::usuario_model::TipoUsuario;

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub usuario: Option<AccessClaims>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Arma el contexto a partir del header `Authorization`. Un token
    /// ausente o inválido deja la request como anónima.
    pub fn from_authorization(
        tokens: &TokenService,
        authorization: Option<&str>,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        let usuario = authorization
            .and_then(bearer_token)
            .and_then(|token| match tokens.verify_access_token(token) {
                Ok(claims) => Some(claims),
                Err(_) => {
                    log::debug!("(request_context) Bearer inválido, request anónima");
                    None
                }
            });

        RequestContext {
            usuario,
            ip,
            user_agent,
        }
    }

    pub fn require_user(&self) -> ApiResult<&AccessClaims> {
        self.usuario.as_ref().ok_or(ApiError::Unauthenticated)
    }

    pub fn require_tipo(&self, tipos: &[TipoUsuario]) -> ApiResult<&AccessClaims> {
        let claims = self.require_user()?;
        if !tipos.contains(&claims.tipo) {
            return Err(ApiError::Forbidden(format!(
                "Operación no permitida para usuarios '{}'",
                claims.tipo
            )));
        }
        Ok(claims)
    }

    pub fn is_admin(&self) -> bool {
        matches!(&self.usuario, Some(c) if c.tipo == TipoUsuario::Admin)
    }
}

/// Extrae el token de `Bearer <JWT>` (esquema sin distinguir mayúsculas).
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
