//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::error;

use crate::web::state::{AppState, ReviewerIdentity};

/// Middleware that validates the auth session cookie and resolves the
/// reviewer's contact record.
///
/// If valid, inserts a [`ReviewerIdentity`] into request extensions for
/// handlers to use. If invalid, missing, or no longer on the allow-list,
/// returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Extract cookie header
    let cookie_header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Parse session ID from cookie
    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix("session=")
        })
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 3. Validate auth session in database, get the reviewer's email
    let email = state
        .auth_sessions
        .validate_auth_session(auth_session_id)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    // 4. The contact must still be on the allow-list
    let contact = state
        .contacts
        .resolve_contact(&email)
        .await
        .map_err(|e| {
            error!("Failed to resolve contact during auth: {:?}", e);
            StatusCode::UNAUTHORIZED
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // 5. Insert the identity into request extensions
    req.extensions_mut().insert(ReviewerIdentity {
        name: contact.name,
        email: contact.email,
        client_id: contact.client_id,
    });

    // 6. Continue to the handler
    Ok(next.run(req).await)
}
