use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::AppError;

use super::views::{render_template, MessageTemplate};

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTopic => StatusCode::BAD_REQUEST,
            AppError::Generation(_) | AppError::Http(_) | AppError::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::StoreUnavailable(_) => {
                "The archive is temporarily unavailable. Please try again later.".to_string()
            }
            AppError::NotFound(id) => format!("There is no article number {id}."),
            AppError::InvalidTopic => "Please search for something.".to_string(),
            AppError::Generation(e) => format!("Our writers are on strike: {e}"),
            AppError::Http(_) => "Could not reach the article writers.".to_string(),
            AppError::Json(_) => "The article writers sent back gibberish.".to_string(),
            _ => "An internal error occurred.".to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request failed: {}", self);
        }

        render_template(MessageTemplate::new("Error", message), status)
    }
}
