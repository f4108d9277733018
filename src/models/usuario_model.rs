//! models/usuario_model.rs
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::empresa_model::RegistroEmpresaInput;

/// Columnas públicas de `usuarios` (todo menos `password`).
pub const USUARIO_COLUMNS: &str =
    "id, email, nombre, apellido, tipo, telefono, activo, ultimo_acceso, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipoUsuario {
    Empleador,
    Alumno,
    Egresado,
    Admin,
}

impl TipoUsuario {
    /// Valor guardado en `usuarios.tipo` y en el JWT.
    pub fn as_str(&self) -> &'static str {
        match self {
            TipoUsuario::Empleador => "empleador",
            TipoUsuario::Alumno => "alumno",
            TipoUsuario::Egresado => "egresado",
            TipoUsuario::Admin => "admin",
        }
    }
}

impl fmt::Display for TipoUsuario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TipoUsuario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empleador" => Ok(TipoUsuario::Empleador),
            "alumno" => Ok(TipoUsuario::Alumno),
            "egresado" => Ok(TipoUsuario::Egresado),
            "admin" => Ok(TipoUsuario::Admin),
            other => Err(anyhow!("Tipo de usuario desconocido: '{}'", other)),
        }
    }
}

/// Fila de `usuarios` tal como sale de la DB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsuarioRow {
    pub id: i32,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub tipo: String,
    pub telefono: Option<String>,
    pub activo: bool,
    pub ultimo_acceso: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fila de `usuarios` con el hash bcrypt, solo para login.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsuarioConPassword {
    #[sqlx(flatten)]
    pub usuario: UsuarioRow,
    pub password: String,
}

#[derive(Debug, Clone, SimpleObject)]
pub struct Usuario {
    pub id: i32,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    pub tipo: TipoUsuario,
    pub telefono: Option<String>,
    pub activo: bool,
    pub ultimo_acceso: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UsuarioRow> for Usuario {
    type Error = anyhow::Error;

    fn try_from(row: UsuarioRow) -> Result<Self, Self::Error> {
        Ok(Usuario {
            tipo: row.tipo.parse()?,
            id: row.id,
            email: row.email,
            nombre: row.nombre,
            apellido: row.apellido,
            telefono: row.telefono,
            activo: row.activo,
            ultimo_acceso: row.ultimo_acceso,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Datos de registro. `empresa` es obligatoria para empleadores;
/// `carrera`/`semestre`/`anioEgreso` alimentan el perfil de alumno o egresado.
#[derive(Clone, InputObject)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub nombre: String,
    pub apellido: String,
    pub tipo: TipoUsuario,
    pub telefono: Option<String>,
    /// Cargo del empleador dentro de la empresa.
    pub cargo: Option<String>,
    pub empresa: Option<RegistroEmpresaInput>,
    pub carrera: Option<String>,
    pub semestre: Option<i32>,
    pub anio_egreso: Option<i32>,
}
