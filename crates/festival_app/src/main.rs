use anyhow::Result;
use festival_app::app::{run, AppConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,festival_core=debug")),
        )
        .init();
    let config = AppConfig::from_env()?;
    run(config).await
}
