//! gridagent - power system analysis chat agent
//!
//! `gridagent serve` runs the analysis tools as an MCP server on
//! stdin/stdout; `gridagent chat` talks to a model that can call them.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "gridagent")]
#[command(about = "Chat agent for power system analysis", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Model to use, e.g. openai/gpt-4o (overrides CHAT_MODEL and config files)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Sampling temperature
    #[arg(long, global = true)]
    pub temperature: Option<f32>,

    /// Do not bind any tools
    #[arg(long, global = true)]
    pub no_tools: bool,

    /// Run the tool calls of one response concurrently
    #[arg(long, global = true)]
    pub concurrent: bool,

    /// Workspace whose .config/gridagent/config.yaml is applied after the user config
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Log debug messages to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the power system tools over MCP on stdin/stdout
    Serve,

    /// List the tools offered by the configured tool servers
    Tools,

    /// Call one power system tool in-process and print its JSON answer
    Call {
        /// Tool name, e.g. load_and_run_power_flow
        tool: String,

        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },

    /// Chat with the agent; without a message, start an interactive session
    Chat {
        /// Single message to send
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve => commands::serve(&cli).await,
        Commands::Tools => commands::tools(&cli).await,
        Commands::Call { tool, args } => commands::call(&cli, tool, args).await,
        Commands::Chat { message } => commands::chat(&cli, message.as_deref()).await,
    }
}
