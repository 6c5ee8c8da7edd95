use anyhow::Result;
use colored::Colorize;

use crate::app::{init_config, Config, ConfigSnapshot};
use crate::constants::BOT_DISPLAY_NAME;

/// Initialize configuration files
pub fn run_init() -> Result<()> {
    let created = init_config()?;
    if created.is_empty() {
        println!("Configuration already present, nothing written");
    }
    for path in created {
        println!("{} {}", "Created".green(), path.display());
    }
    Ok(())
}

/// Show version information
pub fn show_version() {
    println!("{} v{}", BOT_DISPLAY_NAME, env!("CARGO_PKG_VERSION"));
    println!("   Relays chat messages to a MuChat agent");
}

/// Validate a configuration and print the snapshot it derives to
pub fn check_config(config: &Config) -> Result<()> {
    let snapshot = match ConfigSnapshot::derive(config) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            println!("  [ERROR] {}", e);
            return Err(e.into());
        }
    };

    println!("MuChat Configuration:");
    println!();
    println!("  [OK] API key: {}", snapshot.masked_api_key());
    println!("  [OK] Agent: {}", snapshot.agent_id.green());
    println!("  Endpoint: {}", snapshot.api_base);
    println!("  Reply mode: {} (stream: {})", snapshot.reply_mode, snapshot.stream);
    println!("  Turn timeout: {}s", snapshot.turn_timeout.as_secs());
    println!("  Debug: {}", snapshot.debug);
    println!(
        "  Channels: {} ({} allowed, {} blocked)",
        snapshot.channel_access,
        snapshot.channel_allow.len(),
        snapshot.channel_block.len()
    );
    println!(
        "  Users: {} ({} allowed, {} blocked)",
        snapshot.user_access,
        snapshot.user_allow.len(),
        snapshot.user_block.len()
    );
    Ok(())
}
