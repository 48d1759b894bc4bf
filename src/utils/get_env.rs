use anyhow::{Context, Error};
use dotenv::dotenv;
use std::env;
use std::str::FromStr;

/// Loads `.env` into the process environment. Call once at startup, before
/// anything else reads the environment.
pub fn load_dotenv() {
    dotenv().ok();
}

/// Unset and blank values both read as `None`.
pub fn get_optional_env_var(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

pub fn non_blank(raw: Option<String>) -> Option<String> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        _ => None,
    }
}

pub fn require_var(key: &str, raw: Option<String>) -> Result<String, Error> {
    non_blank(raw).with_context(|| format!("missing environment variable {key}"))
}

pub fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match non_blank(raw) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}

pub fn flag_value(raw: Option<String>) -> bool {
    match non_blank(raw) {
        Some(raw) => !matches!(raw.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"),
        None => false,
    }
}
