use duelroom::prelude::*;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DuelroomError> {
    let config = ServerConfig::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = DuelroomServerBuilder::from_config(&config).build().await?;
    tracing::info!(addr = %server.local_addr()?, "duelroom listening");

    server.run().await
}
