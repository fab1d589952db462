mod app;
mod modules;
mod types;
mod utils;

use crate::app::App;
use tracing_subscriber::prelude::*;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(err) = App::new().await.serve().await {
        tracing::error!("Server stopped: {}", err);
        std::process::exit(1);
    }
}
