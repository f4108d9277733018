//! models/auditoria_model.rs
use async_graphql::{Json, SimpleObject};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub mod acciones {
    pub const CREATE: &str = "CREATE";
    pub const UPDATE: &str = "UPDATE";
    pub const LINK: &str = "LINK";
    pub const LOGIN: &str = "LOGIN";
    pub const LOGIN_FAILED: &str = "LOGIN_FAILED";
    pub const LOGOUT: &str = "LOGOUT";
    pub const UPDATE_PASSWORD: &str = "UPDATE_PASSWORD";
}

pub const AUDITORIA_COLUMNS: &str =
    "id, usuario_id, accion, tabla, registro_id, detalle, ip, created_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditoriaRow {
    pub id: i64,
    pub usuario_id: Option<i32>,
    pub accion: String,
    pub tabla: String,
    pub registro_id: Option<i32>,
    pub detalle: Option<Value>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct Auditoria {
    pub id: i64,
    pub usuario_id: Option<i32>,
    pub accion: String,
    pub tabla: String,
    pub registro_id: Option<i32>,
    pub detalle: Option<Json<Value>>,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditoriaRow> for Auditoria {
    fn from(row: AuditoriaRow) -> Self {
        Auditoria {
            id: row.id,
            usuario_id: row.usuario_id,
            accion: row.accion,
            tabla: row.tabla,
            registro_id: row.registro_id,
            detalle: row.detalle.map(Json),
            ip: row.ip,
            created_at: row.created_at,
        }
    }
}

/// Fila de auditoría por insertar.
#[derive(Debug, Clone)]
pub struct NuevaAuditoria {
    pub usuario_id: Option<i32>,
    pub accion: &'static str,
    pub tabla: &'static str,
    pub registro_id: Option<i32>,
    pub detalle: Option<Value>,
    pub ip: Option<String>,
}

impl NuevaAuditoria {
    pub fn new(accion: &'static str, tabla: &'static str) -> Self {
        NuevaAuditoria {
            usuario_id: None,
            accion,
            tabla,
            registro_id: None,
            detalle: None,
            ip: None,
        }
    }

    pub fn usuario(mut self, usuario_id: i32) -> Self {
        self.usuario_id = Some(usuario_id);
        self
    }

    pub fn registro(mut self, registro_id: i32) -> Self {
        self.registro_id = Some(registro_id);
        self
    }

    pub fn detalle(mut self, detalle: Value) -> Self {
        self.detalle = Some(detalle);
        self
    }

    pub fn ip(mut self, ip: Option<&str>) -> Self {
        self.ip = ip.map(str::to_string);
        self
    }
}
