//! tests/error_tests.rs
use async_graphql::ErrorExtensions;

use crate::errors::ApiError;

#[test]
fn cada_error_tiene_su_codigo() {
    let casos = [
        (ApiError::Unauthenticated, "UNAUTHENTICATED"),
        (ApiError::Forbidden("x".into()), "FORBIDDEN"),
        (ApiError::InvalidCredentials, "INVALID_CREDENTIALS"),
        (ApiError::InvalidToken, "INVALID_TOKEN"),
        (ApiError::UserNotFound, "USER_NOT_FOUND"),
        (ApiError::UserInactive, "USER_INACTIVE"),
        (ApiError::EmailAlreadyExists, "EMAIL_ALREADY_EXISTS"),
        (ApiError::EmpresaNotFound, "EMPRESA_NOT_FOUND"),
        (ApiError::bad_input("x"), "BAD_USER_INPUT"),
        (ApiError::Internal(anyhow::anyhow!("boom")), "INTERNAL_SERVER_ERROR"),
    ];
    for (err, code) in casos {
        assert_eq!(err.code(), code);
    }
}

#[test]
fn errores_internos_no_exponen_detalle() {
    let err = ApiError::Internal(anyhow::anyhow!("password authentication failed for user postgres"));
    assert_eq!(err.public_message(), "Error interno del servidor");

    let gql = err.extend();
    assert_eq!(gql.message, "Error interno del servidor");
}

#[test]
fn extension_code_viaja_en_el_error_graphql() {
    let gql = ApiError::EmailAlreadyExists.extend();
    let json = serde_json::to_value(gql.extensions.as_ref().unwrap()).unwrap();
    assert_eq!(json["code"], "EMAIL_ALREADY_EXISTS");
    assert_eq!(gql.message, "El email ya está registrado");
}

#[test]
fn sqlx_row_not_found_es_interno() {
    let err: ApiError = sqlx::Error::RowNotFound.into();
    assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
}
