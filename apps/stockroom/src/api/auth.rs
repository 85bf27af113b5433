//! # Authentication Module
//!
//! Admin token authentication for the Stockroom HTTP API.
//!
//! Only mutating requests (POST/PUT/DELETE) are gated; reads stay open so
//! the storefront pages keep working without credentials.
//!
//! ## Configuration
//!
//! - `STOCKROOM_ADMIN_TOKEN`: If set, mutating requests require this token
//!
//! ## Usage
//!
//! Send the token in the Authorization header:
//! ```text
//! Authorization: Bearer <admin-token>
//! ```

use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

// =============================================================================
// ADMIN TOKEN AUTHENTICATION
// =============================================================================

/// Get the admin token from the environment.
///
/// Returns `Some(token)` if `STOCKROOM_ADMIN_TOKEN` is set and non-empty,
/// `None` otherwise (leaving mutations unauthenticated).
pub fn get_admin_token_from_env() -> Option<String> {
    std::env::var("STOCKROOM_ADMIN_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
}

/// Admin token authentication middleware.
///
/// If `STOCKROOM_ADMIN_TOKEN` is set:
/// - GET/HEAD/OPTIONS requests are always allowed
/// - POST/PUT/DELETE requests require `Authorization: Bearer <token>`
///
/// If it is not set, all requests are allowed.
pub async fn admin_token_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_admin_token_from_env() else {
        return Ok(next.run(request).await);
    };

    // Reads are public
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            // Support both "Bearer <token>" and raw "<token>" formats
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

            // Constant-time comparison to prevent timing attacks.
            // Pad both tokens to the same length so ct_eq always runs over
            // the same number of bytes, preventing length-leaking side channels.
            let provided_bytes = provided.as_bytes();
            let expected_bytes = expected.as_bytes();

            let max_len = provided_bytes.len().max(expected_bytes.len());
            let mut padded_provided = vec![0u8; max_len];
            let mut padded_expected = vec![0u8; max_len];
            padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
            padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

            let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
            let is_valid = bytes_match && provided_bytes.len() == expected_bytes.len();

            if is_valid {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_admin_token",
                    "Authentication failed: invalid admin token"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header on mutating request"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
