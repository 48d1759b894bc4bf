use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use thiserror::Error;

/// Failures while receiving and staging the multipart upload.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{}", describe_multipart(.0))]
    Multipart(#[from] MultipartError),

    #[error("failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_multipart(err: &MultipartError) -> String {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        "upload too large: the request body exceeds the size limit".to_string()
    } else {
        format!("malformed multipart body: {err}")
    }
}

/// Failures of the upload -> backend -> render flow that surface as a plain-text 500.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("incomplete upload: missing {}", .missing.join(", "))]
    IncompleteUpload { missing: Vec<&'static str> },

    #[error("backend request timed out")]
    Timeout,

    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend returned a body that is not an image ({len} bytes)")]
    NotAnImage { len: usize },

    #[error("failed to read staged upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ProxyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream body when one arrived, otherwise the error text.
    pub fn upstream_detail(&self) -> String {
        match self {
            ProxyError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Timeout
        } else {
            ProxyError::Transport(err.to_string())
        }
    }
}
