//! auth/mod.rs
//! JWT, hashing de contraseñas y contexto autenticado por request.

pub mod context;
pub mod password;
pub mod token;
