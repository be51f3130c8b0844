//! Admin capability checks.
//!
//! Edit rights are granted by a pre-shared admin key, compared in constant
//! time to mitigate timing attacks.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the admin key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Cookie carrying the admin key for browser sessions.
pub const ADMIN_COOKIE: &str = "chat_widget_admin";

/// Message returned when edit rights are missing.
pub const ACCESS_DENIED: &str = "Sorry, you are not allowed to manage these options.";

/// Who is asking, as far as the request tells us.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub key: Option<String>,
}

impl Credentials {
    /// Pull the admin key from `x-api-key`, a bearer token, or the admin cookie.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bearer = || {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
                .map(|s| s.to_string())
        };

        let cookie = || {
            headers
                .get_all(header::COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(';'))
                .filter_map(|pair| pair.trim().split_once('='))
                .find(|(name, _)| *name == ADMIN_COOKIE)
                .map(|(_, value)| value.to_string())
        };

        Self {
            key: header_key.or_else(bearer).or_else(cookie),
        }
    }
}

/// Decides whether a caller may change the widget settings.
pub trait Authorizer: Send + Sync {
    fn current_user_may_edit(&self, credentials: &Credentials) -> bool;
}

/// Grants edit rights to callers presenting the configured key.
///
/// With no key configured every caller may edit (dev mode).
#[derive(Debug, Clone)]
pub struct PskAuthorizer {
    expected: Option<String>,
}

impl PskAuthorizer {
    pub fn new(expected: Option<String>) -> Self {
        Self { expected }
    }
}

impl Authorizer for PskAuthorizer {
    fn current_user_may_edit(&self, credentials: &Credentials) -> bool {
        let Some(expected) = &self.expected else {
            return true;
        };

        match &credentials.key {
            Some(provided) => constant_time_compare(provided, expected),
            None => false,
        }
    }
}

/// Middleware rejecting callers without edit rights.
pub async fn require_editor(
    authorizer: Arc<dyn Authorizer>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = Credentials::from_headers(request.headers());

    if authorizer.current_user_may_edit(&credentials) {
        next.run(request).await
    } else {
        tracing::warn!("Rejected settings access to {}", request.uri().path());
        AppError::Forbidden(ACCESS_DENIED.to_string()).into_response()
    }
}

/// Perform constant-time string comparison.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    // Constant-time comparison
    a_bytes.ct_eq(b_bytes).into()
}
