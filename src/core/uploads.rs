use crate::core::errors::{ProxyError, UploadError};
use crate::utils::names::unique_file_name;
use axum::extract::Multipart;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    User,
    Style,
    Color,
}

impl UploadField {
    pub const ALL: [UploadField; 3] = [UploadField::User, UploadField::Style, UploadField::Color];

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadField::User => "user",
            UploadField::Style => "style",
            UploadField::Color => "color",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == name)
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: UploadField,
    /// Client-supplied and untrusted, only used for logging.
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub path: PathBuf,
    pub size: u64,
}

/// Whatever subset of the three fields the client actually sent.
#[derive(Debug, Default)]
pub struct StagedUpload {
    pub user: Option<UploadedFile>,
    pub style: Option<UploadedFile>,
    pub color: Option<UploadedFile>,
}

/// All three files are present.
#[derive(Debug, Clone)]
pub struct CompleteUpload {
    pub user: UploadedFile,
    pub style: UploadedFile,
    pub color: UploadedFile,
}

impl StagedUpload {
    fn slot(&mut self, field: UploadField) -> &mut Option<UploadedFile> {
        match field {
            UploadField::User => &mut self.user,
            UploadField::Style => &mut self.style,
            UploadField::Color => &mut self.color,
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        [
            (UploadField::User, self.user.is_none()),
            (UploadField::Style, self.style.is_none()),
            (UploadField::Color, self.color.is_none()),
        ]
        .into_iter()
        .filter(|(_, absent)| *absent)
        .map(|(field, _)| field.as_str())
        .collect()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        [&self.user, &self.style, &self.color]
            .into_iter()
            .flatten()
            .map(|file| file.path.clone())
            .collect()
    }

    pub fn require_all(self) -> Result<CompleteUpload, ProxyError> {
        let missing = self.missing();
        match (self.user, self.style, self.color) {
            (Some(user), Some(style), Some(color)) => Ok(CompleteUpload { user, style, color }),
            _ => Err(ProxyError::IncompleteUpload { missing }),
        }
    }
}

impl CompleteUpload {
    pub fn files(&self) -> [&UploadedFile; 3] {
        [&self.user, &self.style, &self.color]
    }
}

/// Streams every recognised file field of the request into `dir`.
pub async fn receive_uploads(
    multipart: &mut Multipart,
    dir: &Path,
) -> Result<StagedUpload, UploadError> {
    let mut staged = StagedUpload::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        let Some(upload_field) = UploadField::from_name(&name) else {
            tracing::warn!(field = %name, "ignoring unexpected multipart field");
            while field.chunk().await?.is_some() {}
            continue;
        };

        if staged.slot(upload_field).is_some() {
            tracing::warn!(field = %name, "ignoring repeated file for field");
            while field.chunk().await?.is_some() {}
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let path = dir.join(unique_file_name(original_name.as_deref()));

        let mut file = File::create(&path).await?;
        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            field = %name,
            original_name = ?original_name,
            path = %path.display(),
            size,
            "staged upload"
        );

        *staged.slot(upload_field) = Some(UploadedFile {
            field: upload_field,
            original_name,
            content_type,
            path,
            size,
        });
    }

    Ok(staged)
}

/// Best-effort removal of staged files; failures are only logged.
pub async fn remove_staged(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove staged upload");
        }
    }
}
