use stylecast::app;
use stylecast::booter::Booter;
use stylecast::config::Config;
use stylecast::server::types::AppState;
use stylecast::utils::get_env::load_dotenv;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    load_dotenv();

    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let port = config.port;
    let serverless = config.serverless;
    tracing::info!(
        backend = %config.backend_url,
        upload_dir = %config.upload_dir.display(),
        "starting stylecast"
    );

    let router = app(AppState::new(config));

    if serverless {
        // the host imports `stylecast::app` instead of talking to a socket
        tracing::info!("serverless mode, not binding a listener");
        return Ok(());
    }

    Booter::new(port).await?.start(router).await
}
