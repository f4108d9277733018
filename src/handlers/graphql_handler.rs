//! handlers/graphql_handler.rs
//! Endpoint POST /graphql.

use std::net::{IpAddr, SocketAddr};

use actix_web::{http::header, web, HttpRequest};
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::auth::{context::RequestContext, token::TokenService};
use crate::config::app_config::ServerConfig;
use crate::graphql::AppSchema;

/// Valida el bearer token (si viene) y ejecuta la operación con el
/// `RequestContext` resultante.
pub async fn graphql_endpoint(
    schema: web::Data<AppSchema>,
    tokens: web::Data<TokenService>,
    server: web::Data<ServerConfig>,
    http_req: HttpRequest,
    gql_req: GraphQLRequest,
) -> GraphQLResponse {
    let ctx = build_request_context(&tokens, &http_req, server.trust_proxy);
    log::debug!(
        "(graphql_endpoint) Request de {:?} (autenticado={})",
        ctx.ip,
        ctx.usuario.is_some()
    );

    schema.execute(gql_req.into_inner().data(ctx)).await.into()
}

pub fn build_request_context(
    tokens: &TokenService,
    req: &HttpRequest,
    trust_proxy: bool,
) -> RequestContext {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip = client_ip(req, trust_proxy);

    RequestContext::from_authorization(tokens, authorization, ip, user_agent)
}

/// IP del cliente. Sin `trust_proxy` solo cuenta el socket; con él se usa
/// el header de proxy si trae una IP válida.
pub fn client_ip(req: &HttpRequest, trust_proxy: bool) -> Option<String> {
    let peer = req.peer_addr().map(|addr| addr.ip());
    if !trust_proxy {
        return peer.map(|ip| ip.to_string());
    }

    let forwarded = req
        .connection_info()
        .realip_remote_addr()
        .and_then(parse_ip);
    forwarded.or(peer).map(|ip| ip.to_string())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim();
    raw.parse::<IpAddr>()
        .or_else(|_| raw.parse::<SocketAddr>().map(|addr| addr.ip()))
        .ok()
}
