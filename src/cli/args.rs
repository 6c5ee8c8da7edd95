use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::BOT_USERNAME;

#[derive(Parser, Debug)]
#[command(name = "muchat")]
#[command(version)]
#[command(about = "Relays chat messages to a MuChat agent and streams the answers back", long_about = None)]
pub struct Cli {
    /// Path to configuration file (replaces the global and local files)
    #[arg(short, long, env = "MUCHAT_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask the agent one question and print the answer as it arrives
    Ask {
        /// The question
        query: String,

        /// Request a streamed answer regardless of the configuration
        #[arg(long)]
        stream: bool,

        /// Agent to ask instead of the configured one
        #[arg(long)]
        agent: Option<String>,
    },
    /// Feed message events (one JSON object per line) through the bridge
    Replay {
        /// File with events; stdin when omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// User id of the bot account
        #[arg(long, default_value = "muchat-bot")]
        bot_id: String,

        /// Username of the bot account
        #[arg(long, default_value = BOT_USERNAME)]
        bot_username: String,

        /// Channels the bot has joined (all when omitted)
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,

        /// Apply configuration file changes while replaying
        #[arg(long)]
        watch: bool,

        /// Print only the per-turn outcomes and the summary, not each post
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate the configuration and show what it resolves to
    Check,
    /// Initialize configuration
    Init,
    /// Show version information
    Version,
}
