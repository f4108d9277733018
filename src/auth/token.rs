//! auth/token.rs
//! Emisión y verificación de JWT (HS256).
//!
//! El access token lleva `id`, `email`, `tipo`, `nombre`, `apellido`; el
//! refresh token lleva el usuario y la sesión (`sid`) que lo respalda.

use std::{sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::app_config::AuthConfig;
use crate::errors::{ApiError, ApiResult};
use crate::models::usuario_model::{TipoUsuario, Usuario};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub id: i32,
    pub email: String,
    pub tipo: TipoUsuario,
    pub nombre: String,
    pub apellido: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: i32,
    pub sid: i32,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    access_encoding: Arc<EncodingKey>,
    access_decoding: Arc<DecodingKey>,
    refresh_encoding: Arc<EncodingKey>,
    refresh_decoding: Arc<DecodingKey>,
    header: Header,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let access_secret = config.jwt_secret.as_bytes();
        let refresh_secret = config.jwt_refresh_secret.as_bytes();

        TokenService {
            access_encoding: Arc::new(EncodingKey::from_secret(access_secret)),
            access_decoding: Arc::new(DecodingKey::from_secret(access_secret)),
            refresh_encoding: Arc::new(EncodingKey::from_secret(refresh_secret)),
            refresh_decoding: Arc::new(DecodingKey::from_secret(refresh_secret)),
            header: Header::new(Algorithm::HS256),
            validation: Validation::new(Algorithm::HS256),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token(&self, usuario: &Usuario) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = AccessClaims {
            id: usuario.id,
            email: usuario.email.clone(),
            tipo: usuario.tipo,
            nombre: usuario.nombre.clone(),
            apellido: usuario.apellido.clone(),
            iat,
            exp: expira_en(iat, self.access_ttl)?,
        };
        self.encode_access(&claims)
    }

    /// Firma claims ya armados (útil para reemitir o para pruebas).
    pub fn encode_access(&self, claims: &AccessClaims) -> Result<String> {
        encode(&self.header, claims, &self.access_encoding).context("Fallo al firmar access token")
    }

    pub fn issue_refresh_token(&self, usuario_id: i32, sesion_id: i32) -> Result<String> {
        let iat = Utc::now().timestamp();
        let claims = RefreshClaims {
            id: usuario_id,
            sid: sesion_id,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: expira_en(iat, self.refresh_ttl)?,
        };
        encode(&self.header, &claims, &self.refresh_encoding)
            .context("Fallo al firmar refresh token")
    }

    pub fn verify_access_token(&self, token: &str) -> ApiResult<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("(verify_access_token) Token rechazado: {}", e);
                ApiError::InvalidToken
            })
    }

    pub fn verify_refresh_token(&self, token: &str) -> ApiResult<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("(verify_refresh_token) Token rechazado: {}", e);
                ApiError::InvalidToken
            })
    }
}

/// `iat + ttl` en segundos, sin desbordar.
fn expira_en(iat: i64, ttl: Duration) -> Result<i64> {
    i64::try_from(ttl.as_secs())
        .ok()
        .and_then(|secs| iat.checked_add(secs))
        .ok_or_else(|| anyhow!("Duración de token fuera de rango: {:?}", ttl))
}
