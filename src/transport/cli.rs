//! One-shot CLI commands

use crate::agent::{
    ChatOrchestrator, CredentialValidator, Credentials, DefaultGateways,
    GatewayFactory, Provider,
};
use crate::config::Config;
use crate::llm::Message;
use anyhow::{bail, Result};
use colored::Colorize;
use std::sync::Arc;

fn gateways(config: Config) -> (Arc<Config>, Arc<dyn GatewayFactory>) {
    let config = Arc::new(config);
    let gateways: Arc<dyn GatewayFactory> = Arc::new(DefaultGateways::new(config.clone()));
    (config, gateways)
}

fn require_keys(credentials: &Credentials) -> Result<()> {
    if let Err(e) = credentials.require() {
        bail!("{} (pass --openai-key/--airtable-key or set OPENAI_API_KEY/AIRTABLE_API_KEY)", e);
    }
    Ok(())
}

/// Check both keys against their services
pub async fn run_validate_keys(config: Config, credentials: Credentials) -> Result<()> {
    require_keys(&credentials)?;
    let (_, gateways) = gateways(config);

    match CredentialValidator::new(gateways).validate(&credentials).await {
        Ok(()) => {
            println!("{} Both API keys are valid and working!", "✓".green());
            Ok(())
        }
        Err(e) => {
            let which = match e.rejected_provider() {
                Some(Provider::OpenAi) => "OpenAI API key rejected",
                Some(Provider::Airtable) => "Airtable API key rejected or connection failed",
                None => "Validation failed",
            };
            println!("{} {}", "✗".red(), which.bold());
            bail!("{}", e)
        }
    }
}

/// Print the tool catalog the tool server exposes for this key
pub async fn run_list_tools(config: Config, airtable_key: &str) -> Result<()> {
    if airtable_key.trim().is_empty() {
        bail!("An Airtable API key is required (pass --airtable-key or set AIRTABLE_API_KEY)");
    }
    let (_, gateways) = gateways(config);

    let tools = gateways.tools().list_tools(airtable_key.trim()).await?;
    println!("{}", format!("{} tools available", tools.len()).bold().cyan());
    println!();
    for tool in &tools {
        println!("  {}  {}", tool.name.green(), tool.description);
    }
    Ok(())
}

/// Run one chat turn and print the reply
pub async fn run_ask(config: Config, credentials: Credentials, message: &str) -> Result<()> {
    require_keys(&credentials)?;
    let (config, gateways) = gateways(config);

    let orchestrator = ChatOrchestrator::new(
        gateways,
        config.chat.system_prompt.as_str(),
        config.chat.fallback_reply.as_str(),
    );

    match orchestrator
        .run(&credentials, vec![Message::user(message)])
        .await
    {
        Ok(outcome) => {
            for call in &outcome.invoked_tools {
                println!("{} {} {}", "→".dimmed(), call.name.yellow(), call.raw_arguments().dimmed());
            }
            if !outcome.invoked_tools.is_empty() {
                println!();
            }
            println!("{}", outcome.reply);
            Ok(())
        }
        Err(e) => bail!("{}", e),
    }
}
