//! tests/db_tests.rs
//! Servicios contra PostgreSQL. `sqlx::test` crea una base temporal por
//! test y corre las migraciones. Requieren `DATABASE_URL`:
//!
//! `DATABASE_URL=postgres://postgres@localhost/postgres cargo test -- --ignored`

use serde_json::Value;
use sqlx::PgPool;

use crate::auth::context::RequestContext;
use crate::errors::ApiError;
use crate::models::auth_model::AuthPayload;
use crate::models::empresa_model::{ActualizarEmpresaInput, RegistroEmpresaInput};
use crate::models::usuario_model::{RegisterInput, TipoUsuario};
use crate::services::AppServices;
use crate::tests::{register_input, test_auth_config};

const RUT_ANDINOS: &str = "12.345.678-5";

fn servicios(pool: PgPool) -> AppServices {
    AppServices::new(pool, &test_auth_config())
}

fn ctx_anonimo() -> RequestContext {
    RequestContext {
        usuario: None,
        ip: Some("127.0.0.1".to_string()),
        user_agent: Some("db-tests".to_string()),
    }
}

fn ctx_de(services: &AppServices, payload: &AuthPayload) -> RequestContext {
    RequestContext {
        usuario: Some(services.tokens.verify_access_token(&payload.token).unwrap()),
        ..ctx_anonimo()
    }
}

fn empleador(email: &str, rut: &str) -> RegisterInput {
    let mut input = register_input(TipoUsuario::Empleador);
    input.email = email.to_string();
    input.cargo = Some("Gerente".to_string());
    input.empresa = Some(RegistroEmpresaInput {
        rut: rut.to_string(),
        razon_social: "Servicios Andinos SpA".to_string(),
        nombre_fantasia: None,
        giro: None,
        direccion: None,
        comuna: Some("Santiago".to_string()),
        region: None,
        telefono: None,
        email_contacto: None,
        sitio_web: None,
        descripcion: None,
    });
    input
}

async fn contar(pool: &PgPool, tabla: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", tabla))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn contar_auditoria(pool: &PgPool, usuario_id: i32, accion: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM auditoria WHERE usuario_id = $1 AND accion = $2")
        .bind(usuario_id)
        .bind(accion)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn es_admin(pool: &PgPool, empresa_id: i32, usuario_id: i32) -> bool {
    sqlx::query_scalar(
        "SELECT es_admin FROM empresa_usuario WHERE empresa_id = $1 AND usuario_id = $2",
    )
    .bind(empresa_id)
    .bind(usuario_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn empleador_con_rut_nuevo_crea_empresa_y_queda_admin(pool: PgPool) {
    let services = servicios(pool.clone());

    let payload = services
        .usuarios
        .register(empleador("ana@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();

    let empresa = payload.empresa.clone().unwrap();
    assert_eq!(empresa.rut, "12345678-5");
    assert_eq!(payload.usuario.tipo, TipoUsuario::Empleador);
    assert_eq!(payload.expires_in, 24 * 3600);
    assert!(es_admin(&pool, empresa.id, payload.usuario.id).await);

    // usuarios + empresas, y el vínculo
    assert_eq!(contar_auditoria(&pool, payload.usuario.id, "CREATE").await, 2);
    assert_eq!(contar_auditoria(&pool, payload.usuario.id, "LINK").await, 1);
    assert_eq!(contar(&pool, "sesion").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn empleador_con_rut_existente_se_vincula_sin_admin(pool: PgPool) {
    let services = servicios(pool.clone());
    let primero = services
        .usuarios
        .register(empleador("ana@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();

    let segundo = services
        .usuarios
        .register(empleador("luis@andinos.cl", "123456785"), &ctx_anonimo())
        .await
        .unwrap();

    let empresa_id = primero.empresa.as_ref().unwrap().id;
    assert_eq!(segundo.empresa.as_ref().unwrap().id, empresa_id);
    assert!(!es_admin(&pool, empresa_id, segundo.usuario.id).await);
    assert_eq!(contar(&pool, "empresas").await, 1);
    assert_eq!(contar_auditoria(&pool, segundo.usuario.id, "CREATE").await, 1);
    assert_eq!(contar_auditoria(&pool, segundo.usuario.id, "LINK").await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn registro_que_falla_a_mitad_no_deja_filas(pool: PgPool) {
    let services = servicios(pool.clone());
    let mut input = empleador("ana@andinos.cl", RUT_ANDINOS);
    // empresa_usuario.cargo es VARCHAR(120): falla después de crear usuario y empresa
    input.cargo = Some("x".repeat(200));

    let res = services.usuarios.register(input, &ctx_anonimo()).await;
    assert!(matches!(res, Err(ApiError::Internal(_))));

    for tabla in ["usuarios", "empresas", "empresa_usuario", "auditoria", "sesion"] {
        assert_eq!(contar(&pool, tabla).await, 0, "quedaron filas en {}", tabla);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn email_repetido_es_email_already_exists(pool: PgPool) {
    let services = servicios(pool.clone());
    services
        .usuarios
        .register(register_input(TipoUsuario::Alumno), &ctx_anonimo())
        .await
        .unwrap();

    let mut repetido = register_input(TipoUsuario::Egresado);
    repetido.email = "ANA.PEREZ@empresa.cl".to_string();
    let res = services.usuarios.register(repetido, &ctx_anonimo()).await;

    assert!(matches!(res, Err(ApiError::EmailAlreadyExists)));
    assert_eq!(contar(&pool, "usuarios").await, 1);
    assert_eq!(contar(&pool, "egresados").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn login_con_password_incorrecta_audita_el_intento(pool: PgPool) {
    let services = servicios(pool.clone());
    let registrado = services
        .usuarios
        .register(register_input(TipoUsuario::Alumno), &ctx_anonimo())
        .await
        .unwrap();
    let id = registrado.usuario.id;

    let res = services
        .usuarios
        .login("ana.perez@empresa.cl", "otra-clave", &ctx_anonimo())
        .await;
    assert!(matches!(res, Err(ApiError::InvalidCredentials)));
    assert_eq!(contar_auditoria(&pool, id, "LOGIN_FAILED").await, 1);

    let ok = services
        .usuarios
        .login("  ANA.Perez@empresa.cl ", "secreto123", &ctx_anonimo())
        .await
        .unwrap();
    assert_eq!(ok.usuario.id, id);
    assert!(ok.usuario.ultimo_acceso.is_some());
    assert_eq!(contar_auditoria(&pool, id, "LOGIN").await, 1);

    let desconocido = services
        .usuarios
        .login("nadie@viasuc.cl", "secreto123", &ctx_anonimo())
        .await;
    assert!(matches!(desconocido, Err(ApiError::UserNotFound)));

    sqlx::query("UPDATE usuarios SET activo = FALSE WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .unwrap();
    let inactivo = services
        .usuarios
        .login("ana.perez@empresa.cl", "secreto123", &ctx_anonimo())
        .await;
    assert!(matches!(inactivo, Err(ApiError::UserInactive)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn refresh_token_no_se_puede_reusar(pool: PgPool) {
    let services = servicios(pool);
    let registrado = services
        .usuarios
        .register(register_input(TipoUsuario::Egresado), &ctx_anonimo())
        .await
        .unwrap();

    let rotado = services
        .usuarios
        .refresh(&registrado.refresh_token, &ctx_anonimo())
        .await
        .unwrap();
    assert_eq!(rotado.usuario.id, registrado.usuario.id);

    let reuso = services
        .usuarios
        .refresh(&registrado.refresh_token, &ctx_anonimo())
        .await;
    assert!(matches!(reuso, Err(ApiError::InvalidToken)));

    // logout idempotente; la sesión cerrada ya no refresca
    assert!(services
        .usuarios
        .logout(&rotado.refresh_token, &ctx_anonimo())
        .await
        .unwrap());
    assert!(services
        .usuarios
        .logout(&rotado.refresh_token, &ctx_anonimo())
        .await
        .unwrap());
    let cerrado = services
        .usuarios
        .refresh(&rotado.refresh_token, &ctx_anonimo())
        .await;
    assert!(matches!(cerrado, Err(ApiError::InvalidToken)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn solo_el_admin_de_la_empresa_la_actualiza(pool: PgPool) {
    let services = servicios(pool.clone());
    let admin = services
        .usuarios
        .register(empleador("ana@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();
    let miembro = services
        .usuarios
        .register(empleador("luis@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();
    let empresa_id = admin.empresa.as_ref().unwrap().id;

    let input = ActualizarEmpresaInput {
        giro: Some("Tecnología".to_string()),
        comuna: Some("  ".to_string()),
        ..ActualizarEmpresaInput::default()
    };

    let res = services
        .empresas
        .actualizar(empresa_id, input.clone(), &ctx_de(&services, &miembro))
        .await;
    assert!(matches!(res, Err(ApiError::Forbidden(_))));

    let actualizada = services
        .empresas
        .actualizar(empresa_id, input, &ctx_de(&services, &admin))
        .await
        .unwrap();
    assert_eq!(actualizada.giro.as_deref(), Some("Tecnología"));
    assert_eq!(actualizada.comuna, None);

    let detalle: Option<Value> = sqlx::query_scalar(
        "SELECT detalle FROM auditoria WHERE accion = 'UPDATE' AND tabla = 'empresas' AND registro_id = $1",
    )
    .bind(empresa_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    let detalle = detalle.unwrap();
    assert!(detalle["campos"]["giro"]["antes"].is_null());
    assert_eq!(detalle["campos"]["giro"]["despues"], "Tecnología");
    assert_eq!(detalle["campos"]["comuna"]["antes"], "Santiago");
    assert!(detalle["campos"]["comuna"]["despues"].is_null());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn no_miembro_recibe_forbidden_exista_o_no_la_empresa(pool: PgPool) {
    let services = servicios(pool);
    let admin = services
        .usuarios
        .register(empleador("ana@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();
    let alumno = services
        .usuarios
        .register(register_input(TipoUsuario::Alumno), &ctx_anonimo())
        .await
        .unwrap();
    let empresa_id = admin.empresa.as_ref().unwrap().id;
    let ctx = ctx_de(&services, &alumno);

    for id in [empresa_id, empresa_id + 1000] {
        let obtener = services.empresas.obtener(id, &ctx).await;
        assert!(matches!(obtener, Err(ApiError::Forbidden(_))), "obtener({})", id);

        let input = ActualizarEmpresaInput {
            giro: Some("x".to_string()),
            ..ActualizarEmpresaInput::default()
        };
        let actualizar = services.empresas.actualizar(id, input, &ctx).await;
        assert!(matches!(actualizar, Err(ApiError::Forbidden(_))), "actualizar({})", id);
    }

    let propia = services
        .empresas
        .obtener(empresa_id, &ctx_de(&services, &admin))
        .await
        .unwrap();
    assert_eq!(propia.id, empresa_id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn actualizacion_fallida_hace_rollback(pool: PgPool) {
    let services = servicios(pool.clone());
    let admin = services
        .usuarios
        .register(empleador("ana@andinos.cl", RUT_ANDINOS), &ctx_anonimo())
        .await
        .unwrap();
    let empresa_id = admin.empresa.as_ref().unwrap().id;

    // razon_social es VARCHAR(255)
    let input = ActualizarEmpresaInput {
        razon_social: Some("x".repeat(300)),
        giro: Some("Tecnología".to_string()),
        ..ActualizarEmpresaInput::default()
    };
    let res = services
        .empresas
        .actualizar(empresa_id, input, &ctx_de(&services, &admin))
        .await;
    assert!(matches!(res, Err(ApiError::Internal(_))));

    let (razon_social, giro): (String, Option<String>) =
        sqlx::query_as("SELECT razon_social, giro FROM empresas WHERE id = $1")
            .bind(empresa_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(razon_social, "Servicios Andinos SpA");
    assert_eq!(giro, None);
    assert_eq!(contar_auditoria(&pool, admin.usuario.id, "UPDATE").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requiere PostgreSQL (DATABASE_URL)"]
async fn cambiar_password_cierra_todas_las_sesiones(pool: PgPool) {
    let services = servicios(pool.clone());
    let registrado = services
        .usuarios
        .register(register_input(TipoUsuario::Alumno), &ctx_anonimo())
        .await
        .unwrap();
    let otra_sesion = services
        .usuarios
        .login("ana.perez@empresa.cl", "secreto123", &ctx_anonimo())
        .await
        .unwrap();
    let ctx = ctx_de(&services, &registrado);

    let mala = services
        .usuarios
        .cambiar_password("equivocada", "nueva-clave-1", &ctx)
        .await;
    assert!(matches!(mala, Err(ApiError::InvalidCredentials)));

    assert!(services
        .usuarios
        .cambiar_password("secreto123", "nueva-clave-1", &ctx)
        .await
        .unwrap());

    for token in [&registrado.refresh_token, &otra_sesion.refresh_token] {
        let res = services.usuarios.refresh(token, &ctx_anonimo()).await;
        assert!(matches!(res, Err(ApiError::InvalidToken)));
    }
    let abiertas: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sesion WHERE cerrada_at IS NULL")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(abiertas, 0);
    assert_eq!(
        contar_auditoria(&pool, registrado.usuario.id, "UPDATE_PASSWORD").await,
        1
    );

    services
        .usuarios
        .login("ana.perez@empresa.cl", "nueva-clave-1", &ctx_anonimo())
        .await
        .unwrap();
}
