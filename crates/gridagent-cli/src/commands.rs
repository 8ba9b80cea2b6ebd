//! Subcommand implementations

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use gridagent_core::config::{
    load_config, AgentConfig, ChannelConfig, ConfigFile, ToolExecution, DEFAULT_CHANNEL,
};
use gridagent_core::logging::{file_logger, ConsoleLogger, FileLogger, LogLevel, Logger};
use gridagent_core::mcp::serve_stdio;
use gridagent_core::{AnalysisSession, ChatAgent, Conversation, PowerToolRegistry};

use crate::Cli;

fn logger(cli: &Cli) -> Arc<dyn Logger> {
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    Arc::new(ConsoleLogger::new().with_level(level))
}

fn overrides(cli: &Cli) -> ConfigFile {
    ConfigFile {
        model: cli.model.clone(),
        temperature: cli.temperature,
        enable_tools: cli.no_tools.then_some(false),
        tool_execution: cli.concurrent.then_some(ToolExecution::Concurrent),
        ..Default::default()
    }
}

async fn config(cli: &Cli, logger: &dyn Logger) -> Result<AgentConfig> {
    let mut config = load_config(cli.workspace.as_deref(), Some(&overrides(cli)), logger)
        .await
        .context("failed to load configuration")?;

    // The bundled server is this very binary
    if config.mcp_servers.get(DEFAULT_CHANNEL) == Some(&ChannelConfig::bundled()) {
        if let Ok(exe) = std::env::current_exe() {
            config.mcp_servers.insert(
                DEFAULT_CHANNEL.to_string(),
                ChannelConfig::stdio(exe.display().to_string(), vec!["serve".to_string()]),
            );
        }
    }
    Ok(config)
}

fn registry(logger: Arc<dyn Logger>) -> Arc<PowerToolRegistry> {
    let session = AnalysisSession::new().with_logger(Arc::clone(&logger));
    Arc::new(PowerToolRegistry::new(session, logger))
}

pub async fn serve(cli: &Cli) -> Result<()> {
    // GRIDAGENT_DEBUG sends logs to the debug file
    let logger: Arc<dyn Logger> = if file_logger::is_enabled() {
        Arc::new(FileLogger::new("serve"))
    } else {
        let level = if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        };
        Arc::new(ConsoleLogger::with_prefix("[gridagent serve]").with_level(level))
    };
    serve_stdio(registry(Arc::clone(&logger)), logger)
        .await
        .map_err(anyhow::Error::from_boxed)
        .context("tool server stopped")
}

pub async fn tools(cli: &Cli) -> Result<()> {
    let logger = logger(cli);
    let config = config(cli, logger.as_ref()).await?;
    let agent = ChatAgent::from_config(config, logger);
    let tools = agent.transport().list_tools().await;
    if tools.is_empty() {
        println!("No tools available");
        return Ok(());
    }
    for tool in tools {
        println!("{:<26} {}", tool.name, tool.description);
    }
    Ok(())
}

pub async fn call(cli: &Cli, tool: &str, args: &str) -> Result<()> {
    let arguments: serde_json::Value =
        serde_json::from_str(args).context("arguments must be a JSON object")?;
    let registry = registry(logger(cli));
    let name = tool.to_string();
    let payload = tokio::task::spawn_blocking(move || registry.call(&name, arguments)).await?;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

pub async fn chat(cli: &Cli, message: Option<&str>) -> Result<()> {
    let logger = logger(cli);
    let config = config(cli, logger.as_ref()).await?;
    let mut conversation = Conversation::new(ChatAgent::from_config(config, logger));

    if let Some(text) = message {
        let outcome = conversation.send(text).await?;
        println!("{}", outcome.reply());
        return Ok(());
    }

    println!(
        "gridagent chat ({}). /clear resets, /quit exits.",
        conversation.agent().config().model
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                conversation.clear();
                println!("History cleared");
                continue;
            }
            _ => {}
        }
        match conversation.send(line).await {
            Ok(outcome) => {
                for result in &outcome.tool_results {
                    let mark = if result.is_failure() { "failed" } else { "ok" };
                    println!("  [{}: {}]", result.tool_name, mark);
                }
                println!("{}", outcome.reply());
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
