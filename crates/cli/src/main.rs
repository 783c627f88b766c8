use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wa-relay")]
#[command(about = "WhatsApp to completion-service relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server. Credentials come from the config file and environment (WHATSAPP_TOKEN, WHATSAPP_PHONE_NUMBER_ID, VERIFY_TOKEN, OPENAI_API_KEY, PORT); a .env file is loaded first.
    Serve {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Listen port (default from PORT, config, or 3000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Send one text message through WhatsApp (useful to check credentials).
    Send {
        /// Config file path (default: RELAY_CONFIG_PATH or ./relay.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Recipient phone number with country code, no '+'
        #[arg(long)]
        to: String,

        /// Message text
        #[arg(long, short)]
        message: String,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wa-relay {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                log::error!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Send {
            config,
            to,
            message,
        }) => {
            if let Err(e) = run_send(config, &to, &message).await {
                log::error!("send failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

async fn run_serve(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = relay::config::load_config(config_path)?;
    if let Some(p) = port {
        config.server.port = p;
    }
    log::info!(
        "starting relay on {}:{} (config {})",
        config.server.bind,
        config.server.port,
        path.display()
    );
    relay::gateway::run_gateway(config).await
}

async fn run_send(config_path: Option<PathBuf>, to: &str, message: &str) -> anyhow::Result<()> {
    let (config, _) = relay::config::load_config(config_path)?;
    let client = relay::relay::build_http_client(&config)?;
    let whatsapp = relay::channels::WhatsAppChannel::new(&config.whatsapp, client);
    whatsapp.send_text(to, message).await?;
    println!("message sent to {}", to);
    Ok(())
}
