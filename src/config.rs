use crate::utils::constants::{
    DEFAULT_BODY_LIMIT, DEFAULT_PORT, GENERATE_TIMEOUT, HEALTHZ_TIMEOUT, SERVER_REQUEST_TIMEOUT,
};
use crate::utils::get_env::{flag_value, get_optional_env_var, parse_var, require_var};
use crate::utils::urls::to_url;
use anyhow::{Context, Error};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Url,
    pub port: u16,
    pub serverless: bool,
    pub upload_dir: PathBuf,
    pub body_limit: usize,
    pub request_timeout: Duration,
    pub generate_timeout: Duration,
    pub healthz_timeout: Duration,
    pub cleanup_uploads: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_source(get_optional_env_var)
    }

    /// Builds the config from any key lookup, the process environment in production.
    pub fn from_source<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_backend = require_var("BACKEND_URL", lookup("BACKEND_URL"))?;
        let backend_url =
            to_url(&raw_backend).with_context(|| format!("invalid BACKEND_URL: {raw_backend}"))?;

        let secs = |key: &str, default: Duration| -> Result<Duration, Error> {
            Ok(Duration::from_secs(parse_var(key, lookup(key), default.as_secs())?))
        };

        Ok(Self {
            backend_url,
            port: parse_var("PORT", lookup("PORT"), DEFAULT_PORT)?,
            serverless: flag_value(lookup("VERCEL")),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            body_limit: parse_var("BODY_LIMIT_BYTES", lookup("BODY_LIMIT_BYTES"), DEFAULT_BODY_LIMIT)?,
            request_timeout: secs("REQUEST_TIMEOUT_SECS", SERVER_REQUEST_TIMEOUT)?,
            generate_timeout: secs("GENERATE_TIMEOUT_SECS", GENERATE_TIMEOUT)?,
            healthz_timeout: secs("HEALTHZ_TIMEOUT_SECS", HEALTHZ_TIMEOUT)?,
            cleanup_uploads: flag_value(lookup("CLEANUP_UPLOADS")),
        })
    }

    /// Defaults for everything except the backend location.
    pub fn with_backend(backend_url: Url) -> Self {
        Self {
            backend_url,
            port: DEFAULT_PORT,
            serverless: false,
            upload_dir: std::env::temp_dir(),
            body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: SERVER_REQUEST_TIMEOUT,
            generate_timeout: GENERATE_TIMEOUT,
            healthz_timeout: HEALTHZ_TIMEOUT,
            cleanup_uploads: false,
        }
    }
}
