//! Runnable gallery server.
//!
//! Binds on `GALERRA_ADDR` (default `0.0.0.0:2567`) and serves rooms
//! until the process is terminated. Log verbosity follows `RUST_LOG`.

use galerra::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), GalerraError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("GALERRA_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:2567".to_string());

    let server = GalerraServer::builder().bind(&addr).build().await?;
    tracing::info!(%addr, "gallery server up");
    server.run().await
}
