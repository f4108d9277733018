//! validation.rs
//! Validación y normalización de entradas (email, contraseña, RUT, registro).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ApiError, ApiResult};
use crate::models::usuario_model::{RegisterInput, TipoUsuario};

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("regex de email válida"));

pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 128;

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.len() > 255 || !EMAIL_REGEX.is_match(email) {
        return Err(ApiError::bad_input(format!("Email inválido: '{}'", email)));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ApiError::bad_input(format!(
            "La contraseña debe tener al menos {} caracteres",
            PASSWORD_MIN_LEN
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ApiError::bad_input(format!(
            "La contraseña no puede superar {} caracteres",
            PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}

pub fn validate_required(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_input(format!("El campo '{}' es obligatorio", field)));
    }
    Ok(())
}

/// Valida un RUT chileno y lo devuelve normalizado (`12345678-5`).
/// Acepta puntos, espacios y la K en minúscula.
pub fn validate_rut(raw: &str) -> ApiResult<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '.' && !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if !cleaned.is_ascii() {
        return Err(ApiError::bad_input(format!("RUT inválido: '{}'", raw)));
    }

    // Sin guion, el DV es el último carácter
    let (body, dv) = match cleaned.split_once('-') {
        Some(parts) => parts,
        None => match cleaned.char_indices().last() {
            Some((i, _)) if i > 0 => cleaned.split_at(i),
            _ => return Err(ApiError::bad_input(format!("RUT inválido: '{}'", raw))),
        },
    };

    if body.is_empty() || body.len() > 8 || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_input(format!("RUT inválido: '{}'", raw)));
    }
    let dv = match dv.chars().collect::<Vec<_>>().as_slice() {
        [c] if c.is_ascii_digit() || *c == 'K' => *c,
        _ => return Err(ApiError::bad_input(format!("RUT inválido: '{}'", raw))),
    };

    if rut_check_digit(body) != dv {
        return Err(ApiError::bad_input(format!(
            "Dígito verificador incorrecto para RUT '{}'",
            raw
        )));
    }

    let body = body.trim_start_matches('0');
    if body.is_empty() {
        return Err(ApiError::bad_input(format!("RUT inválido: '{}'", raw)));
    }
    Ok(format!("{}-{}", body, dv))
}

/// Módulo 11 con factores 2..=7 desde el dígito menos significativo.
fn rut_check_digit(body: &str) -> char {
    let sum: u32 = body
        .chars()
        .rev()
        .filter_map(|c| c.to_digit(10))
        .zip((2..=7).cycle())
        .map(|(d, f)| d * f)
        .sum();

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from_digit(n, 10).unwrap_or('0'),
    }
}

/// Valida y normaliza en el lugar los datos de registro.
pub fn validate_register_input(input: &mut RegisterInput) -> ApiResult<()> {
    input.email = normalize_email(&input.email);
    validate_email(&input.email)?;
    validate_password(&input.password)?;
    validate_required("nombre", &input.nombre)?;
    validate_required("apellido", &input.apellido)?;
    input.nombre = input.nombre.trim().to_string();
    input.apellido = input.apellido.trim().to_string();

    match input.tipo {
        TipoUsuario::Admin => {
            return Err(ApiError::bad_input(
                "No se permite registrar usuarios administradores",
            ))
        }
        TipoUsuario::Empleador => {
            let empresa = input.empresa.as_mut().ok_or_else(|| {
                ApiError::bad_input("Un empleador debe registrarse con los datos de su empresa")
            })?;
            empresa.rut = validate_rut(&empresa.rut)?;
            validate_required("razonSocial", &empresa.razon_social)?;
            empresa.razon_social = empresa.razon_social.trim().to_string();
            if let Some(email) = empresa.email_contacto.as_mut() {
                *email = normalize_email(email);
                validate_email(email)?;
            }
        }
        TipoUsuario::Alumno | TipoUsuario::Egresado => {
            if input.empresa.is_some() {
                return Err(ApiError::bad_input(format!(
                    "Un usuario de tipo '{}' no puede registrar una empresa",
                    input.tipo
                )));
            }
        }
    }

    if let Some(semestre) = input.semestre {
        if !(1..=20).contains(&semestre) {
            return Err(ApiError::bad_input("Semestre fuera de rango"));
        }
    }
    if let Some(anio) = input.anio_egreso {
        if !(1950..=2100).contains(&anio) {
            return Err(ApiError::bad_input("Año de egreso fuera de rango"));
        }
    }
    Ok(())
}
