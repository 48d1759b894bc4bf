use crate::config::Config;
use crate::core::errors::ProxyError;
use crate::core::uploads::{CompleteUpload, UploadedFile};
use crate::utils::constants::{GENERATE_PATH, HEALTHZ_PATH};
use crate::utils::urls::endpoint;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;

/// Image bytes returned by `/generate`, with the MIME type sniffed from them.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub mime: &'static str,
}

#[derive(Clone)]
pub struct BackendClient {
    http_client: Client,
    generate_url: Url,
    healthz_url: Url,
    generate_timeout: Duration,
    healthz_timeout: Duration,
}

impl BackendClient {
    pub fn new(http_client: Client, config: &Config) -> Self {
        Self {
            http_client,
            generate_url: endpoint(&config.backend_url, GENERATE_PATH),
            healthz_url: endpoint(&config.backend_url, HEALTHZ_PATH),
            generate_timeout: config.generate_timeout,
            healthz_timeout: config.healthz_timeout,
        }
    }

    /// Single attempt, no retry. Anything but a 2xx carrying image bytes is an error.
    pub async fn generate(&self, upload: &CompleteUpload) -> Result<GeneratedImage, ProxyError> {
        let mut form = Form::new();
        for file in upload.files() {
            form = form.part(file.field.as_str(), file_part(file).await?);
        }

        let start = std::time::Instant::now();
        let response = self
            .http_client
            .post(self.generate_url.clone())
            .multipart(form)
            .timeout(self.generate_timeout)
            .send()
            .await
            .map_err(ProxyError::from_reqwest)?;

        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(ProxyError::from_reqwest)?;
        tracing::info!(
            len = bytes.len(),
            elapsed = ?start.elapsed(),
            "backend generated image"
        );

        let format = image::guess_format(&bytes).map_err(|_| ProxyError::NotAnImage {
            len: bytes.len(),
        })?;

        Ok(GeneratedImage {
            mime: format.to_mime_type(),
            bytes,
        })
    }

    /// Returns the upstream status and body text of `/healthz`.
    pub async fn healthz(&self) -> Result<(u16, String), ProxyError> {
        let response = self
            .http_client
            .get(self.healthz_url.clone())
            .timeout(self.healthz_timeout)
            .send()
            .await
            .map_err(ProxyError::from_reqwest)?;

        let response = ensure_success(response).await?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(ProxyError::from_reqwest)?;
        Ok((status, describe_body(&body)))
    }
}

async fn file_part(file: &UploadedFile) -> Result<Part, ProxyError> {
    let handle = File::open(&file.path).await?;
    let len = handle.metadata().await?.len();
    let file_name = file
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.field.as_str().to_string());

    let part = Part::stream_with_length(Body::wrap_stream(ReaderStream::new(handle)), len)
        .file_name(file_name);

    // mime from the extension, the way browsers label file inputs
    match image::ImageFormat::from_path(&file.path) {
        Ok(format) => part
            .mime_str(format.to_mime_type())
            .map_err(|e| ProxyError::Transport(e.to_string())),
        Err(_) => Ok(part),
    }
}

async fn ensure_success(response: Response) -> Result<Response, ProxyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    Err(ProxyError::Status {
        status: status.as_u16(),
        body: describe_body(&body),
    })
}

/// Structured bodies are re-serialized compactly, anything else is decoded lossily.
pub fn describe_body(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) if value.is_object() || value.is_array() => value.to_string(),
        _ => String::from_utf8_lossy(body).into_owned(),
    }
}
