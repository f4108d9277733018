//! models/mod.rs
//! Módulo raíz para modelos/estructuras compartidas.

pub mod auditoria_model;
pub mod auth_model;
pub mod empresa_model;
pub mod sesion_model;
pub mod usuario_model;
