use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::{domain::auth::JwtManager, error::AppError};
use uuid::Uuid;

/// User context injected into request extensions after authentication
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// Bearer token from the Authorization header, if one was sent
fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(auth_header) = headers.get("authorization") else {
        return Ok(None);
    };

    let auth_header = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization format".to_string()))
}

/// Authentication middleware: rejects requests without a valid bearer token
pub async fn auth_middleware(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())?
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let user_id = jwt_manager.extract_user_id(token)?;
    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

/// Like [`auth_middleware`] but lets anonymous requests through.
/// A token that is present but invalid is still rejected.
pub async fn optional_auth_middleware(
    State(jwt_manager): State<Arc<JwtManager>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(token) = bearer_token(request.headers())? {
        let user_id = jwt_manager.extract_user_id(token)?;
        request.extensions_mut().insert(AuthUser { user_id });
    }

    Ok(next.run(request).await)
}
