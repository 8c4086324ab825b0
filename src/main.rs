use chat_proxy::config::config_search_paths;
use chat_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-proxy",
    about = "Keyed chat proxy — forward browser chat prompts to Gemini or OpenAI",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Provider name: gemini or openai (overrides config)
    #[arg(long)]
    provider: Option<String>,

    /// Directory of static files to serve (overrides config)
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Log file path
    #[arg(long, default_value = "chat-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing .env is fine; the key may come from the real environment.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(provider) = cli.provider {
        config.provider.name = provider;
    }
    if let Some(static_dir) = cli.static_dir {
        config.static_dir = static_dir;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    // Validate config eagerly
    let base_url = config.effective_base_url()?;
    let format = config.api_format()?;
    let model = config.effective_model()?;

    let api_key = match config.resolve_api_key() {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("{e} Chat requests will be answered with 500 until it is set.");
            logger.warn("startup", e.to_string());
            None
        }
    };

    info!("chat-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Provider:  {} ({})", config.provider.name, format);
    info!("  Base URL:  {}", base_url);
    info!("  Model:     {}", model);
    info!("  Port:      {}", config.port);
    info!("  Static:    {}", config.static_dir.display());
    info!("  Log file:  {}", cli.log_file.display());
    if config.request_timeout_secs.is_none() {
        info!("  Timeout:   none (an upstream hang blocks its request)");
    }

    logger.info(
        "startup",
        format!(
            "Starting chat-proxy provider={} base_url={} port={}",
            config.provider.name, base_url, config.port
        ),
    );

    let port = config.port;
    let state = Arc::new(AppState::new(config, api_key, logger)?);

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Server is running on http://localhost:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
