//! graphql/mod.rs
//! Schema GraphQL (async-graphql). Los servicios viajan como data del
//! schema; el `RequestContext` se agrega por request en el handler.

pub mod mutation;
pub mod query;

use async_graphql::{Context, EmptySubscription, Schema};

use crate::auth::context::RequestContext;
use crate::services::AppServices;

pub use self::{mutation::MutationRoot, query::QueryRoot};

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(services: &AppServices) -> AppSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(services.usuarios.clone())
        .data(services.empresas.clone())
        .data(services.auditoria.clone())
        .finish()
}

/// Contexto de la request; si el handler no lo agregó, la request es anónima.
pub(crate) fn request_context(ctx: &Context<'_>) -> RequestContext {
    ctx.data_opt::<RequestContext>()
        .cloned()
        .unwrap_or_else(RequestContext::anonymous)
}
