/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Admin check for the cleanup API.
//!
//! Requests reach the service through a gateway that already verified the
//! bearer token, so claims are read without checking the signature. A
//! caller is an admin when the `X-User-Roles` header lists `admin`, or,
//! without that header, when the token's `realm_access.roles` does.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use cleanup_utils::logging::prelude::*;
use serde::Deserialize;

pub const ROLES_HEADER: &str = "X-User-Roles";
pub const USER_ID_HEADER: &str = "X-UserId";
pub const ADMIN_ROLE: &str = "admin";

/// The authenticated admin, inserted into the request extensions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Caller {
    /// `sub` claim of the token, or the `X-UserId` header
    pub user_id: String,
    /// Raw bearer token, forwarded to the registries
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Claims {
    sub: String,
    realm_access: RealmAccess,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RealmAccess {
    roles: Vec<String>,
}

type Rejection = (StatusCode, Json<serde_json::Value>);

fn forbidden() -> Rejection {
    (
        StatusCode::FORBIDDEN,
        Json(serde_json::json!({"error": "Admin access required"})),
    )
}

/// Rejects non-admin callers with 403 and attaches a [`Caller`] otherwise.
pub async fn admin_middleware(mut request: Request<Body>, next: Next) -> Result<Response, Rejection> {
    match authorize(request.headers()) {
        Ok(caller) => {
            debug!("Admin access granted to {}", caller.user_id);
            request.extensions_mut().insert(caller);
            Ok(next.run(request).await)
        }
        Err(reason) => {
            warn!("Unauthorized access to admin api: {}", reason);
            Err(forbidden())
        }
    }
}

/// Resolves the caller from the request headers.
pub fn authorize(headers: &HeaderMap) -> Result<Caller, String> {
    let token = bearer_token(headers).unwrap_or_default();
    let roles_header = header(headers, ROLES_HEADER);
    let claims = if token.is_empty() {
        None
    } else {
        match decode_claims(&token) {
            Ok(claims) => Some(claims),
            // the gateway's role header is enough on its own
            Err(e) if roles_header.is_some() => {
                debug!("Ignoring undecodable token: {}", e);
                None
            }
            Err(e) => return Err(e),
        }
    };

    let is_admin = match roles_header {
        Some(roles) => roles.split(", ").any(|role| role == ADMIN_ROLE),
        None => claims
            .as_ref()
            .is_some_and(|c| c.realm_access.roles.iter().any(|role| role == ADMIN_ROLE)),
    };
    if !is_admin {
        return Err("caller lacks the admin role".to_string());
    }

    let user_id = claims
        .map(|c| c.sub)
        .filter(|sub| !sub.is_empty())
        .or_else(|| header(headers, USER_ID_HEADER).map(str::to_string))
        .unwrap_or_default();

    Ok(Caller { user_id, token })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = header(headers, "Authorization")?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value);
    Some(token.trim().to_string())
}

fn decode_claims(token: &str) -> Result<Claims, String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| "token is not a JWT".to_string())?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| format!("token payload is not base64: {}", e))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("token payload is not JSON: {}", e))
}
