use crate::core::errors::UploadError;
use crate::server::views::render_error;
use crate::statics::is_development;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

/// Errors rendered as the status-coded error page.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("Request Timeout")]
    Timeout,

    #[error("unhandled middleware error: {0}")]
    Internal(String),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("failed to render page: {0}")]
    Render(#[from] minijinja::Error),

    #[error("failed to read staged upload: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Upload(UploadError::Multipart(e)) => e.status(),
            AppError::Upload(UploadError::Io(_))
            | AppError::Render(_)
            | AppError::Io(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Server-side failures only expose the reason phrase outside development.
    fn public_message(&self, status: StatusCode) -> String {
        if status.is_server_error() {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    /// Renders the error page; `show_details` adds the debug form of the error.
    pub fn render_page(self, show_details: bool) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("internal error: {:#}", self);
        } else {
            tracing::debug!("client error: {}", self);
        }

        let message = self.public_message(status);
        let details = show_details.then(|| format!("{:?}", self));

        match render_error(status.as_u16(), &message, details.as_deref()) {
            Ok(page) => (status, Html(page)).into_response(),
            Err(e) => {
                tracing::error!("failed to render error page: {}", e);
                (status, message).into_response()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.render_page(is_development())
    }
}
