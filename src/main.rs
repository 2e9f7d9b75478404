use std::sync::Arc;

use tracing::{info, warn};

use nudge::{AppState, Config, SmtpRelay, WebServer};

const CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    // Environment overrides may come from a .env file
    dotenvy::dotenv().ok();

    let config = match Config::load_with_env(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    if let Err(e) = nudge::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        nudge::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("nudge {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        smtp = %config.smtp.relay(),
        ssl = config.smtp.use_ssl,
        recipients = config.mail.recipients.len(),
        max_emails_per_hour = config.limits.max_emails_per_hour,
        "Configuration loaded"
    );

    let placeholders = config.placeholder_settings();
    if !placeholders.is_empty() {
        warn!(
            missing = %placeholders.join(", "),
            "Some settings still hold placeholder values"
        );
    }

    let transport = Arc::new(SmtpRelay::new(&config.smtp));
    let state = Arc::new(AppState::new(&config, transport));

    let server = match WebServer::new(&config.server, state) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to create web server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run().await {
        tracing::error!("Web server error: {}", e);
        std::process::exit(1);
    }
}
