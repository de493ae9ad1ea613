use crate::pages;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Route-level failures that surface as dedicated status-coded pages. Anything
/// the user can recover from is handled inside the handlers as a
/// redirect-with-notice instead, and never reaches this type.
pub enum AppError {
    Internal(anyhow::Error),
    NotFound,
    Forbidden,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Internal(e) => {
                // Log the full chain; the client only sees the generic page.
                tracing::error!("Internal server error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, pages::internal_error_page())
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, pages::not_found_page()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, pages::forbidden_page()),
        };
        (status, body).into_response()
    }
}

// Lets handlers use `?` on anything convertible to anyhow::Error.
impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Internal(err.into())
    }
}
