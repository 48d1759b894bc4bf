use chrono::Utc;
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "file";

/// Keeps the last path component of a client-supplied name and replaces
/// anything outside `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(original: Option<&str>) -> String {
    let base = original
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .unwrap_or("");

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

/// `<unix-millis>-<random>-<sanitized name>`
pub fn unique_file_name(original: Option<&str>) -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        &nonce[..8],
        sanitize_file_name(original)
    )
}
