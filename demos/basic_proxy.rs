//! Start a chat-proxy server programmatically.
//!
//! Usage:
//!   export GEMINI_API_KEY=your_key
//!   cargo run --example basic_proxy

use chat_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = ProxyConfig::find_and_load(None)?;
    let base_url = config.effective_base_url()?;
    let api_key = config.resolve_api_key()?;

    println!("Provider: {} ({})", config.provider.name, base_url);
    println!("Model:    {}", config.effective_model()?);

    let logger = SharedLogger::new("proxy-example.log")?;
    let port = config.port;
    let state = Arc::new(AppState::new(config, Some(api_key), logger)?);

    let app = build_router(state);
    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Listening on http://{}", addr);
    println!();
    println!(
        "  curl -s localhost:{}/api/chat -H 'content-type: application/json' \\",
        port
    );
    println!("    -d '{{\"messages\":[{{\"role\":\"user\",\"content\":\"Hello\"}}]}}'");

    axum::serve(listener, app).await?;
    Ok(())
}
