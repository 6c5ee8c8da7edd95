use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::{timeout_at, Instant};

use super::replay::replay_from;
use crate::{
    agent::{AgentClient, AgentRequest, MuChatClient},
    app::{get_config_dir, load_config, load_config_from, Config, ConfigSnapshot, ConfigStore},
    bridge::{BotIdentity, ResponseBridge},
    cli::{check_config, run_init, show_version, Cli, Commands},
    constants::LOCAL_CONFIG_PATH,
    host::ConsoleHost,
    utils::{log_error, log_info, ConfigWatcher, MuChatError},
};

/// Main runtime orchestrator
pub struct Orchestrator {
    cli: Cli,
}

impl Orchestrator {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        match &self.cli.command {
            Commands::Init => run_init(),
            Commands::Version => {
                show_version();
                Ok(())
            }
            Commands::Check => check_config(&self.load_config()?),
            Commands::Ask {
                query,
                stream,
                agent,
            } => self.ask(query, *stream, agent.as_deref()).await,
            Commands::Replay {
                input,
                bot_id,
                bot_username,
                channels,
                watch,
                quiet,
            } => {
                let bot = BotIdentity::new(bot_id.as_str(), bot_username.as_str());
                self.replay(input.as_deref(), bot, channels, *watch, *quiet)
                    .await
            }
        }
    }

    fn load_config(&self) -> Result<Config> {
        load_config_for(self.cli.config.as_deref())
    }

    /// Send one query and print the answer as it streams in
    async fn ask(&self, query: &str, stream: bool, agent: Option<&str>) -> Result<()> {
        let mut config = self.load_config()?;
        if let Some(agent) = agent {
            config.agent_id = agent.to_string();
        }
        config.stream |= stream;
        let snapshot = ConfigSnapshot::derive(&config)?;

        let client = MuChatClient::new()?;
        let deadline = Instant::now() + snapshot.turn_timeout;
        let timed_out = || MuChatError::Timeout(snapshot.turn_timeout);

        let request = AgentRequest::from_snapshot(&snapshot, query.trim());
        let mut answer = timeout_at(deadline, client.ask(request))
            .await
            .map_err(|_| timed_out())??;

        let mut stdout = std::io::stdout();
        loop {
            let chunk = timeout_at(deadline, answer.read_chunk(usize::MAX))
                .await
                .map_err(|_| timed_out())?;
            match chunk {
                Some(text) => {
                    write!(stdout, "{}", text?)?;
                    stdout.flush()?;
                }
                None => break,
            }
        }
        writeln!(stdout)?;
        Ok(())
    }

    /// Run replayed events through a bridge backed by the console host
    async fn replay(
        &self,
        input: Option<&Path>,
        bot: BotIdentity,
        channels: &[String],
        watch: bool,
        quiet: bool,
    ) -> Result<()> {
        let config = self.load_config()?;
        let store = Arc::new(ConfigStore::from_config(&config)?);

        let mut host = ConsoleHost::new();
        if quiet {
            host = host.quiet();
        }
        if !channels.is_empty() {
            host = host.with_member_channels(channels.iter().cloned().collect());
        }

        let bridge = Arc::new(ResponseBridge::new(
            Arc::clone(&store),
            Arc::new(MuChatClient::new()?),
            Arc::new(host),
            bot,
        ));

        let watcher = if watch {
            let explicit = self.cli.config.clone();
            let paths = watched_config_paths(explicit.as_deref())?;
            let watcher = ConfigWatcher::for_files(&paths)?;
            for path in &paths {
                log_info(format!("watching {} for changes", path.display()));
            }
            Some(tokio::spawn(watch_config(watcher, explicit, Arc::clone(&store))))
        } else {
            None
        };

        println!(
            "Replaying events as {} (agent {}, {} mode)",
            bridge.bot().username.green(),
            store.current().agent_id,
            store.current().reply_mode
        );
        let summary = replay_from(bridge, input).await?;
        println!("{}", summary.format());

        if let Some(watcher) = watcher {
            watcher.abort();
        }
        Ok(())
    }
}

/// Load from an explicit file, or from the layered defaults
fn load_config_for(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config_from(path),
        None => load_config(),
    }
}

/// Files whose changes trigger a reload: the explicit file, or every file
/// layer `load_config` reads whose directory exists
fn watched_config_paths(explicit: Option<&Path>) -> Result<Vec<PathBuf>> {
    if let Some(path) = explicit {
        return Ok(vec![path.to_path_buf()]);
    }
    let global = get_config_dir()
        .context("Failed to locate configuration directory")?
        .join("config.toml");
    let mut paths = vec![global];

    let local = PathBuf::from(LOCAL_CONFIG_PATH);
    if local.parent().is_some_and(Path::is_dir) {
        paths.push(local);
    }
    Ok(paths)
}

/// Apply configuration changes one at a time, for as long as the watcher lives
async fn watch_config(mut watcher: ConfigWatcher, explicit: Option<PathBuf>, store: Arc<ConfigStore>) {
    while watcher.changed().await.is_some() {
        let applied = load_config_for(explicit.as_deref())
            .and_then(|config| store.apply(&config).map_err(anyhow::Error::from));
        match applied {
            Ok(version) => log_info(format!("configuration reloaded (version {})", version)),
            Err(e) => log_error("reloading configuration, keeping the previous one", e),
        }
    }
}
