//! errors.rs
//! Taxonomía de errores visible para los clientes GraphQL.
//!
//! Cada variante tiene un código estable que viaja en `extensions.code`.
//! Los errores internos (sqlx, anyhow) se loguean completos y se exponen
//! con un mensaje genérico.
//!
//! Ojo: async-graphql convierte cualquier `Display` con `?`, perdiendo el
//! código. En los resolvers usar siempre `.extend()` (`ResultExt`).

use async_graphql::ErrorExtensions;
use thiserror::Error;

/// Código SQLSTATE de violación de unicidad en PostgreSQL.
const PG_UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No autenticado")]
    Unauthenticated,

    #[error("No autorizado: {0}")]
    Forbidden(String),

    #[error("Credenciales inválidas")]
    InvalidCredentials,

    #[error("Token inválido o expirado")]
    InvalidToken,

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Usuario inactivo")]
    UserInactive,

    #[error("El email ya está registrado")]
    EmailAlreadyExists,

    #[error("Empresa no encontrada")]
    EmpresaNotFound,

    #[error("{0}")]
    BadUserInput(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "UNAUTHENTICATED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::UserNotFound => "USER_NOT_FOUND",
            ApiError::UserInactive => "USER_INACTIVE",
            ApiError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            ApiError::EmpresaNotFound => "EMPRESA_NOT_FOUND",
            ApiError::BadUserInput(_) => "BAD_USER_INPUT",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        ApiError::BadUserInput(msg.into())
    }

    /// Mensaje que ve el cliente.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Internal(_) => "Error interno del servidor".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION)
                && db_err
                    .constraint()
                    .map(|c| c.contains("email"))
                    .unwrap_or(false)
            {
                return ApiError::EmailAlreadyExists;
            }
        }
        ApiError::Internal(anyhow::Error::new(err))
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> async_graphql::Error {
        if let ApiError::Internal(e) = self {
            log::error!("(api_error) Error interno: {:?}", e);
        }
        let code = self.code();
        async_graphql::Error::new(self.public_message()).extend_with(|_, ext| ext.set("code", code))
    }
}
