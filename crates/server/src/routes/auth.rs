use std::sync::Arc;

use axum::{extract::{Request, State}, middleware::Next, response::Response};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use service::taxonomy::{TaxonomyService, TaxonomyStore};

use crate::errors::JsonApiError;

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub jwt_secret: String,
}

#[derive(Clone)]
pub struct ServerState {
    pub taxonomy: Arc<TaxonomyService<dyn TaxonomyStore>>,
    pub auth: ServerAuthConfig,
}

/// Claims accepted on admin tokens; tokens are issued elsewhere.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    #[serde(default)]
    pub iat: Option<usize>,
}

fn bearer_or_cookie(req: &Request) -> Result<String, JsonApiError> {
    let authz = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if let Some(h) = authz {
        return match h.strip_prefix("Bearer ") {
            Some(t) if !t.trim().is_empty() => Ok(t.trim().to_string()),
            _ => {
                tracing::warn!(path = %req.uri().path(), "invalid Authorization format (expect Bearer)");
                Err(JsonApiError::unauthorized("expected `Authorization: Bearer <token>`"))
            }
        };
    }
    // Fall back to the auth_token cookie
    let cookie_header = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    cookie_header
        .split(';')
        .filter_map(|part| part.trim().strip_prefix("auth_token="))
        .find(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            tracing::warn!(path = %req.uri().path(), "missing Authorization header and auth_token cookie");
            JsonApiError::unauthorized("missing bearer token")
        })
}

/// Route-layer middleware for admin routes: HS256 bearer token with `exp` enforced.
pub async fn require_bearer_token_state(
    State(state): State<ServerState>,
    req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let token = bearer_or_cookie(&req)?;
    let key = DecodingKey::from_secret(state.auth.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(&token, &key, &validation) {
        Ok(data) => {
            tracing::debug!(sub = %data.claims.sub, "admin token accepted");
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(path = %req.uri().path(), err = %e, "token validation failed");
            Err(JsonApiError::unauthorized("invalid or expired token"))
        }
    }
}
