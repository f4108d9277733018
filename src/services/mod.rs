//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod auditoria_service;
pub mod empresa_service;
pub mod sesion_service;
pub mod usuario_service;

use sqlx::PgPool;

use crate::auth::token::TokenService;
use crate::config::app_config::AuthConfig;

use self::{
    auditoria_service::AuditoriaService, empresa_service::EmpresaService,
    sesion_service::SesionService, usuario_service::UsuarioService,
};

/// Todos los servicios, construidos sobre el mismo pool.
#[derive(Clone)]
pub struct AppServices {
    pub tokens: TokenService,
    pub auditoria: AuditoriaService,
    pub sesiones: SesionService,
    pub empresas: EmpresaService,
    pub usuarios: UsuarioService,
}

impl AppServices {
    pub fn new(db_pool: PgPool, auth: &AuthConfig) -> Self {
        let tokens = TokenService::new(auth);
        let auditoria = AuditoriaService::new(db_pool.clone());
        let sesiones = SesionService::new(db_pool.clone());
        let empresas = EmpresaService::new(db_pool.clone(), auditoria.clone());
        let usuarios = UsuarioService::new(
            db_pool,
            tokens.clone(),
            auditoria.clone(),
            sesiones.clone(),
            empresas.clone(),
            auth.bcrypt_cost,
        );

        AppServices {
            tokens,
            auditoria,
            sesiones,
            empresas,
            usuarios,
        }
    }
}
