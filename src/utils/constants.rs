use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;

// stays under the 60s execution ceiling of serverless hosts
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(55);
pub const HEALTHZ_TIMEOUT: Duration = Duration::from_secs(5);
pub const SERVER_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub const GENERATE_PATH: &str = "/generate";
pub const HEALTHZ_PATH: &str = "/healthz";

pub const FALLBACK_MIME: &str = "application/octet-stream";
