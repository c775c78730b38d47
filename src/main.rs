use std::sync::Arc;

use clap::{Parser, Subcommand};
use loyalty_relay::commands;
use loyalty_relay::models::ChatMode;
use loyalty_relay::modules::{self, auth::Credentials, logger, LocalStore};

#[derive(Parser)]
#[command(name = "loyalty-relay", version, about = "Loyalty chat relay and forwarding proxy")]
struct Cli {
    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the forwarding proxy
    Serve {
        #[arg(long)]
        port: Option<u16>,
        /// Upstream base URL (overrides MCP_BACKEND_SERVER)
        #[arg(long)]
        backend: Option<String>,
        /// Upstream timeout in milliseconds (overrides MCP_PROXY_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Listen on 0.0.0.0 instead of 127.0.0.1
        #[arg(long)]
        lan: bool,
    },
    /// Interactive chat in the terminal
    Chat {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        mode: Option<ChatMode>,
    },
    /// Check that the backend accepts the configured credentials
    Login {
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Clear chat history and start a new session
    Reset,
    /// Truncate log files
    ClearLogs,
    /// Write the current configuration (with defaults filled in) to the data directory
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match (&cli.log_level, &cli.command) {
        (Some(level), _) => level.clone(),
        (None, Command::Serve { .. }) => "info".to_string(),
        (None, _) => "warn".to_string(),
    };
    logger::init_logger(&default_level);

    let mut config = modules::load_app_config()?;

    match cli.command {
        Command::Serve {
            port,
            backend,
            timeout_ms,
            lan,
        } => {
            let mut proxy = config.proxy;
            proxy.apply_env();
            if let Some(port) = port {
                proxy.port = port;
            }
            if let Some(backend) = backend {
                proxy.backend_server = Some(backend);
            }
            if let Some(ms) = timeout_ms.filter(|ms| *ms > 0) {
                proxy.timeout_ms = ms;
            }
            if lan {
                proxy.allow_lan_access = true;
            }
            commands::proxy::run_proxy_service(proxy).await?;
        }
        Command::Chat { base_url, mode } => {
            if let Some(url) = base_url {
                config.client.base_url = url;
            }
            if let Some(mode) = mode {
                config.client.default_mode = mode;
            }
            let store = Arc::new(LocalStore::open_default()?);
            commands::chat::run_chat(config.client, store).await?;
        }
        Command::Login { base_url } => {
            let base_url = base_url.unwrap_or(config.client.base_url);
            let credentials = Credentials {
                username: config.client.username,
                password: config.client.password,
            };
            println!("Testing...");
            let result =
                commands::probe_login(&base_url, &credentials, config.client.request_timeout_secs)
                    .await;
            println!("{}", result);
        }
        Command::Reset => {
            let store = Arc::new(LocalStore::open_default()?);
            let session = commands::reset_local_state(store)?;
            println!("Conversation cleared. New session: {}", session);
        }
        Command::ClearLogs => {
            commands::clear_log_cache().map_err(anyhow::Error::msg)?;
            println!("Logs cleared.");
        }
        Command::InitConfig => {
            modules::save_app_config(&config)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
