//! models/sesion_model.rs
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SESION_COLUMNS: &str = "id, usuario_id, ip, user_agent, created_at, expires_at, cerrada_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Sesion {
    pub id: i32,
    pub usuario_id: i32,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub cerrada_at: Option<DateTime<Utc>>,
}
