use data_server::{AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let config = ServerConfig::load().unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let addr = config.socket_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("listening on {addr}");
    data_server::run(listener, AppState::new(config.settings())).await
}
