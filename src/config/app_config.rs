//! config/app_config.rs
//! Configuración global de la API (servidor, base de datos, auth).
//! Se carga desde variables de entorno; `.env` se lee antes en main.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Costo bcrypt usado por los hashes ya existentes en `usuarios`.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Tope para la vida de un token: 10 años.
pub const MAX_TTL_SECS: u64 = 10 * 365 * 86_400;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Tomar la IP del cliente de `Forwarded`/`X-Forwarded-For`. Solo
    /// detrás de un proxy que reescriba esos headers.
    pub trust_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 4000,
            workers: 2,
            trust_proxy: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    /// SSL activo, sin validar el certificado del servidor.
    pub ssl: bool,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            host: "localhost".to_string(),
            port: 5432,
            name: "viasuc".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            ssl: true,
            max_connections: 20,
        }
    }
}

impl DatabaseConfig {
    /// Opciones de conexión para sqlx. `Require` cifra la conexión pero no
    /// verifica la cadena de certificados.
    pub fn connect_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Disable
        };

        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.name)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(ssl_mode)
    }

    /// Descripción apta para logs (sin contraseña).
    pub fn display_target(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{} (ssl={})",
            self.user, self.host, self.port, self.name, self.ssl
        )
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl AuthConfig {
    /// Valores por defecto (24h / 7d / cost 10) con el secreto indicado
    /// para ambos tipos de token.
    pub fn with_secret(secret: &str) -> Self {
        AuthConfig {
            jwt_secret: secret.to_string(),
            jwt_refresh_secret: secret.to_string(),
            access_ttl: Duration::from_secs(24 * 3600),
            refresh_ttl: Duration::from_secs(7 * 24 * 3600),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración usando `lookup` para resolver cada variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get("HOST").unwrap_or(server_defaults.host),
            port: parse_var(&get, "PORT", server_defaults.port)?,
            workers: parse_var(&get, "HTTP_WORKERS", server_defaults.workers)?,
            trust_proxy: match get("TRUST_PROXY") {
                Some(raw) => parse_bool(&raw).context("TRUST_PROXY inválido")?,
                None => server_defaults.trust_proxy,
            },
        };

        let db_defaults = DatabaseConfig::default();
        let database = DatabaseConfig {
            host: get("DB_HOST").unwrap_or(db_defaults.host),
            port: parse_var(&get, "DB_PORT", db_defaults.port)?,
            name: get("DB_NAME").unwrap_or(db_defaults.name),
            user: get("DB_USER").unwrap_or(db_defaults.user),
            password: lookup("DB_PASSWORD").unwrap_or(db_defaults.password),
            ssl: match get("DB_SSL") {
                Some(raw) => parse_bool(&raw).with_context(|| "DB_SSL inválido")?,
                None => db_defaults.ssl,
            },
            max_connections: parse_var(&get, "DB_MAX_CONNECTIONS", db_defaults.max_connections)?,
        };

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| anyhow!("Falta la variable JWT_SECRET"))?;
        let mut auth = AuthConfig::with_secret(&jwt_secret);
        if let Some(refresh_secret) = get("JWT_REFRESH_SECRET") {
            auth.jwt_refresh_secret = refresh_secret;
        }
        if let Some(raw) = get("JWT_EXPIRES_IN") {
            auth.access_ttl = parse_duration(&raw).context("JWT_EXPIRES_IN inválido")?;
        }
        if let Some(raw) = get("JWT_REFRESH_EXPIRES_IN") {
            auth.refresh_ttl = parse_duration(&raw).context("JWT_REFRESH_EXPIRES_IN inválido")?;
        }
        auth.bcrypt_cost = parse_var(&get, "BCRYPT_ROUNDS", auth.bcrypt_cost)?;
        if !(4..=31).contains(&auth.bcrypt_cost) {
            bail!("BCRYPT_ROUNDS debe estar entre 4 y 31");
        }

        Ok(AppConfig {
            server,
            database,
            auth,
        })
    }
}

fn parse_var<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Valor inválido para {}='{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("Booleano inválido: '{}'", other)),
    }
}

/// Convierte duraciones estilo `24h`, `7d`, `30m`, `3600` a `Duration`.
/// El máximo es `MAX_TTL_SECS`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let value = raw.trim();
    if value.is_empty() {
        bail!("Duración vacía");
    }

    let split_at = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (amount, unit) = value.split_at(split_at);
    if amount.is_empty() {
        bail!("Duración inválida: '{}'", raw);
    }

    let amount: u64 = amount
        .parse()
        .with_context(|| format!("Duración inválida: '{}'", raw))?;
    if amount == 0 {
        bail!("La duración debe ser mayor que cero: '{}'", raw);
    }

    let unit_secs: u64 = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3_600,
        "d" => 86_400,
        "w" => 604_800,
        other => bail!("Unidad de duración desconocida '{}' en '{}'", other, raw),
    };

    let secs = amount
        .checked_mul(unit_secs)
        .filter(|secs| *secs <= MAX_TTL_SECS)
        .ok_or_else(|| anyhow!("Duración fuera de rango (máximo 10 años): '{}'", raw))?;
    Ok(Duration::from_secs(secs))
}
