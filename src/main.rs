use airchat::agent::Credentials;
use airchat::config::Config;
use airchat::transport;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "airchat")]
#[command(author, version, about = "Chat with your Airtable data through an LLM and MCP tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: <config dir>/airchat/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat API
    Serve {
        /// Port to listen on (default from config: 8787)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default from config: 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
    },

    /// Check an OpenAI key and an Airtable token against both services
    ValidateKeys {
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_key: Option<String>,

        #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
        airtable_key: Option<String>,
    },

    /// List the tools the tool server exposes
    ListTools {
        #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
        airtable_key: Option<String>,
    },

    /// Send one message and print the reply
    Ask {
        /// Message to send
        message: String,

        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_key: Option<String>,

        #[arg(long, env = "AIRTABLE_API_KEY", hide_env_values = true)]
        airtable_key: Option<String>,
    },
}

fn credentials(openai_key: Option<String>, airtable_key: Option<String>) -> Credentials {
    Credentials::new(openai_key.unwrap_or_default(), airtable_key.unwrap_or_default())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "airchat=debug,tower_http=debug"
    } else {
        "airchat=info,tower_http=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port, host } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            tracing::info!("Starting HTTP server on {}:{}", host, port);
            transport::http::run_http_server(config, &host, port).await?;
        }
        Commands::ValidateKeys {
            openai_key,
            airtable_key,
        } => {
            transport::cli::run_validate_keys(config, credentials(openai_key, airtable_key))
                .await?;
        }
        Commands::ListTools { airtable_key } => {
            transport::cli::run_list_tools(config, &airtable_key.unwrap_or_default()).await?;
        }
        Commands::Ask {
            message,
            openai_key,
            airtable_key,
        } => {
            transport::cli::run_ask(config, credentials(openai_key, airtable_key), &message)
                .await?;
        }
    }

    Ok(())
}
