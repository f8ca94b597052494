use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Courier CLI — WhatsApp assistant gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory and a default config file.
    Init {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },

    /// Run the webhook gateway. Spawns the configured tool providers and serves
    /// /webhook, /test, and /send.
    Gateway {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// HTTP port (default from config or 5000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send a WhatsApp message through the carrier (operational testing).
    Send {
        /// Config file path (default: COURIER_CONFIG_PATH or ~/.courier/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Recipient number (e.g. "+14155551234" or "whatsapp:+14155551234")
        #[arg(long, value_name = "NUMBER")]
        to: String,

        /// Message body
        message: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("courier {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            to,
            message,
        }) => {
            if let Err(e) = run_send(config, to, message).await {
                log::error!("send failed: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let _dir = lib::init::init_config_dir(&path)?;
    println!(
        "initialized configuration at {}",
        path.parent()
            .unwrap_or(std::path::Path::new("."))
            .display()
    );
    Ok(())
}

async fn run_gateway(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    lib::gateway::run_gateway(config).await
}

async fn run_send(
    config_path: Option<std::path::PathBuf>,
    to: String,
    message: String,
) -> anyhow::Result<()> {
    let (config, _path) = lib::config::load_config(config_path)?;
    let carrier = lib::channels::WhatsAppChannel::new(
        lib::config::resolve_twilio_account_sid(&config),
        lib::config::resolve_twilio_auth_token(&config),
        lib::config::resolve_whatsapp_number(&config),
        config.carrier.api_base.clone(),
    );
    let sid = carrier
        .send_message(&to, &message)
        .await
        .map_err(|e| anyhow::anyhow!(e))?;
    println!("sent: {}", sid);
    Ok(())
}
