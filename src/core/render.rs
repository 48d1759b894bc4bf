use crate::core::backend::GeneratedImage;
use crate::core::uploads::{CompleteUpload, UploadedFile};
use crate::utils::constants::FALLBACK_MIME;
use base64::{Engine as _, engine::general_purpose};

/// One image inlined as base64.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime: String,
    pub base64: String,
}

impl InlineImage {
    pub fn from_bytes(bytes: &[u8], declared_mime: Option<&str>) -> Self {
        let mime = match image::guess_format(bytes) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => declared_mime
                .and_then(bare_mime)
                .unwrap_or(FALLBACK_MIME)
                .to_string(),
        };
        Self {
            mime,
            base64: general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

/// `type/subtype` with parameters dropped, or `None` if either half has
/// characters outside `[A-Za-z0-9.+-]`.
pub fn bare_mime(declared: &str) -> Option<&str> {
    let essence = declared.split(';').next().unwrap_or("").trim();
    let (kind, subtype) = essence.split_once('/')?;
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'))
    };

    (is_token(kind) && is_token(subtype)).then_some(essence)
}

#[derive(Debug, Clone)]
pub struct RenderContext {
    pub user: InlineImage,
    pub style: InlineImage,
    pub color: InlineImage,
    pub result: InlineImage,
}

impl RenderContext {
    /// Re-reads the staged originals from disk and pairs them with the generated image.
    pub async fn build(
        upload: &CompleteUpload,
        generated: &GeneratedImage,
    ) -> Result<Self, std::io::Error> {
        Ok(Self {
            user: inline_file(&upload.user).await?,
            style: inline_file(&upload.style).await?,
            color: inline_file(&upload.color).await?,
            result: InlineImage::from_bytes(&generated.bytes, Some(generated.mime)),
        })
    }
}

async fn inline_file(file: &UploadedFile) -> Result<InlineImage, std::io::Error> {
    let bytes = tokio::fs::read(&file.path).await?;
    Ok(InlineImage::from_bytes(&bytes, file.content_type.as_deref()))
}
