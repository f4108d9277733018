//! auth/password.rs
//! bcrypt sobre el pool bloqueante de tokio, para no frenar los workers.

use anyhow::{Context, Result};

pub async fn hash_password(plain: &str, cost: u32) -> Result<String> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .context("Tarea de hash interrumpida")?
        .context("Fallo al hashear la contraseña")
}

/// `Ok(false)` si no coincide; `Err` si el hash guardado está corrupto.
pub async fn verify_password(plain: &str, hash: &str) -> Result<bool> {
    let plain = plain.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .context("Tarea de verificación interrumpida")?
        .context("Hash bcrypt inválido")
}
