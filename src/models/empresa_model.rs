//! models/empresa_model.rs
use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::{ApiError, ApiResult};
use crate::validation::{normalize_email, validate_email};

pub const EMPRESA_COLUMNS: &str = "id, rut, razon_social, nombre_fantasia, giro, direccion, \
     comuna, region, telefono, email_contacto, sitio_web, descripcion, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow, SimpleObject)]
pub struct Empresa {
    pub id: i32,
    pub rut: String,
    pub razon_social: String,
    pub nombre_fantasia: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub region: Option<String>,
    pub telefono: Option<String>,
    pub email_contacto: Option<String>,
    pub sitio_web: Option<String>,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Empresa vista desde la relación `empresa_usuario`.
#[derive(Debug, Clone, sqlx::FromRow, SimpleObject)]
pub struct EmpresaDeUsuario {
    #[sqlx(flatten)]
    pub empresa: Empresa,
    pub cargo: Option<String>,
    pub es_admin: bool,
}

#[derive(Debug, Clone, InputObject)]
pub struct RegistroEmpresaInput {
    pub rut: String,
    pub razon_social: String,
    pub nombre_fantasia: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub region: Option<String>,
    pub telefono: Option<String>,
    pub email_contacto: Option<String>,
    pub sitio_web: Option<String>,
    pub descripcion: Option<String>,
}

/// Campos editables de una empresa. El RUT no se puede cambiar.
/// Un string vacío limpia el campo (salvo `razonSocial`).
#[derive(Debug, Clone, Default, InputObject)]
pub struct ActualizarEmpresaInput {
    pub razon_social: Option<String>,
    pub nombre_fantasia: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub region: Option<String>,
    pub telefono: Option<String>,
    pub email_contacto: Option<String>,
    pub sitio_web: Option<String>,
    pub descripcion: Option<String>,
}

/// Columna a actualizar con su nuevo valor (`None` = NULL).
pub type CampoEmpresa = (&'static str, Option<String>);

impl ActualizarEmpresaInput {
    /// Lista de columnas informadas, ya normalizadas y validadas.
    pub fn campos(&self) -> ApiResult<Vec<CampoEmpresa>> {
        let candidatos: [(&'static str, &Option<String>); 10] = [
            ("razon_social", &self.razon_social),
            ("nombre_fantasia", &self.nombre_fantasia),
            ("giro", &self.giro),
            ("direccion", &self.direccion),
            ("comuna", &self.comuna),
            ("region", &self.region),
            ("telefono", &self.telefono),
            ("email_contacto", &self.email_contacto),
            ("sitio_web", &self.sitio_web),
            ("descripcion", &self.descripcion),
        ];

        let mut campos = Vec::new();
        for (columna, valor) in candidatos {
            let Some(valor) = valor else { continue };
            let valor = valor.trim();
            let valor = if valor.is_empty() {
                None
            } else {
                Some(valor.to_string())
            };

            match (columna, &valor) {
                ("razon_social", None) => {
                    return Err(ApiError::bad_input("La razón social no puede quedar vacía"))
                }
                ("email_contacto", Some(email)) => {
                    let email = normalize_email(email);
                    validate_email(&email)?;
                    campos.push((columna, Some(email)));
                    continue;
                }
                _ => {}
            }
            campos.push((columna, valor));
        }

        if campos.is_empty() {
            return Err(ApiError::bad_input(
                "Debe indicar al menos un campo para actualizar",
            ));
        }
        Ok(campos)
    }
}
