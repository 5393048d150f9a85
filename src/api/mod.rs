//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.

mod categories;
mod comments;
mod posts;
mod reviews;
mod search;
mod tags;
mod users;

pub use categories::*;
pub use comments::*;
pub use posts::*;
pub use reviews::*;
pub use search::*;
pub use tags::*;
pub use users::*;

use std::str::FromStr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Parse an optional query parameter, reporting bad input in the error envelope.
fn parse_param<T: FromStr>(raw: Option<&str>, field: &str) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("Invalid {}: '{}'", field, value))),
    }
}

/// Resolve `page` and `size` query parameters. The end of the requested page
/// must fit in a SQL integer.
fn page_params(
    page: Option<&str>,
    size: Option<&str>,
    default_size: usize,
    max_size: usize,
) -> Result<(usize, usize), AppError> {
    let page = parse_param::<usize>(page, "page")?.unwrap_or(0);
    let size = parse_param::<usize>(size, "size")?.unwrap_or(default_size);
    if size == 0 || size > max_size {
        return Err(AppError::Validation(format!(
            "Page size must be between 1 and {}",
            max_size
        )));
    }

    let end = page.checked_add(1).and_then(|p| p.checked_mul(size));
    if end.and_then(|e| i64::try_from(e).ok()).is_none() {
        return Err(AppError::Validation(format!("Page {} is out of range", page)));
    }
    Ok((page, size))
}

/// Reject blank required text fields.
fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
