//! voicesig - adaptive voice-signature learning CLI

// Use the library crate for all modules
use voicesig::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (WARN level by default, use RUST_LOG=info for more)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    cli::run().await
}
