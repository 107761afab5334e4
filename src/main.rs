use jimeng_bridge::{
    config::LoggingConfig, logger, ImageClient, ImageTools, JimengConfig, ToolServer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env is optional; the process environment wins for anything already set
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // Storage settings are not read here; the tool server never touches COS.
    let logging = LoggingConfig::from_env()?;
    let config = JimengConfig::from_env()?;
    logger::init_with_config(logger::LoggerConfig::from_settings(&logging))?;

    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    logger::log_startup_info(
        jimeng_bridge::server::SERVER_NAME,
        env!("CARGO_PKG_VERSION"),
        "stdio",
    );
    logger::log_jimeng_config(&config);

    let client = match ImageClient::new(config) {
        Ok(client) => {
            log::info!("✅ Jimeng client initialized");
            client
        }
        Err(e) => {
            log::error!("❌ Failed to initialize Jimeng client: {}", e);
            log::error!("💡 Set JIMENG_SESSION_ID to the session token of your Jimeng account");
            return Err(e.into());
        }
    };

    let server = ToolServer::new(ImageTools::new(client));
    log::info!("🎨 Waiting for tool requests on stdin");
    server.serve_stdio().await?;

    Ok(())
}
