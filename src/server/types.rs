use crate::config::Config;
use crate::core::backend::BackendClient;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendClient,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        // per-request timeouts are set on each backend call
        let http_client = Client::new();
        Self {
            backend: BackendClient::new(http_client, &config),
            config: Arc::new(config),
        }
    }
}
