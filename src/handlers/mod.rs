pub mod admin;
pub mod bookings;
pub mod health;
pub mod schedule;

use axum::http::HeaderMap;

use crate::errors::AppError;

/// Bearer-token gate for the staff-facing endpoints. Role-level
/// authorization lives outside this service.
pub(crate) fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
