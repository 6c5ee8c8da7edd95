use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::access::AccessMode;
use crate::constants::{
    CONFIG_ENV_PREFIX, DEFAULT_MUCHAT_API_BASE, LOCAL_CONFIG_PATH, TURN_TIMEOUT_SECS,
};
use crate::utils::MuChatError;

/// How the answer is published back into the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// One reply post, created once the answer is complete
    #[default]
    SingleShot,
    /// A placeholder post edited in place as fragments arrive
    Incremental,
}

impl fmt::Display for ReplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleShot => f.write_str("single_shot"),
            Self::Incremental => f.write_str("incremental"),
        }
    }
}

/// Raw configuration, as loaded from files and the environment.
///
/// Access lists are kept as the comma-separated strings the operator wrote;
/// [`ConfigSnapshot::derive`](super::ConfigSnapshot::derive) turns them into sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the MuChat service
    #[serde(deserialize_with = "opaque_string")]
    pub muchat_api_key: String,
    /// Agent that answers the questions
    #[serde(deserialize_with = "opaque_string")]
    pub agent_id: String,
    /// Extra diagnostics in the log
    pub enable_debug: bool,

    /// allow_all | allow_selected | block_selected | block_all
    pub channel_access: String,
    #[serde(deserialize_with = "opaque_string")]
    pub channel_allow_list: String,
    #[serde(deserialize_with = "opaque_string")]
    pub channel_block_list: String,

    /// allow_all | allow_selected | block_selected
    pub user_access: String,
    #[serde(deserialize_with = "opaque_string")]
    pub user_allow_list: String,
    #[serde(deserialize_with = "opaque_string")]
    pub user_block_list: String,

    pub reply_mode: ReplyMode,
    /// Ask the agent for a Server-Sent-Events answer
    pub stream: bool,
    pub api_base: String,
    pub turn_timeout_secs: u64,
}

/// Ids and keys are opaque text, but figment reads `MUCHAT_AGENT_ID=12345`
/// as a number. Accept any scalar and keep its text.
fn opaque_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Flag(bool),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Unsigned(n) => n.to_string(),
        Scalar::Signed(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Flag(b) => b.to_string(),
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            muchat_api_key: String::new(),
            agent_id: String::new(),
            enable_debug: false,
            channel_access: AccessMode::AllowAll.to_string(),
            channel_allow_list: String::new(),
            channel_block_list: String::new(),
            user_access: AccessMode::AllowAll.to_string(),
            user_allow_list: String::new(),
            user_block_list: String::new(),
            reply_mode: ReplyMode::default(),
            stream: false,
            api_base: DEFAULT_MUCHAT_API_BASE.to_string(),
            turn_timeout_secs: TURN_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Check the fields every turn depends on
    pub fn validate(&self) -> Result<(), MuChatError> {
        if self.muchat_api_key.trim().is_empty() {
            return Err(MuChatError::Config("API key must not be empty".to_string()));
        }
        if self.agent_id.trim().is_empty() {
            return Err(MuChatError::Config("agent id must not be empty".to_string()));
        }
        if self.turn_timeout_secs == 0 {
            return Err(MuChatError::Config(
                "turn_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let config_dir = get_config_dir()?;
    let global_config = config_dir.join("config.toml");
    let local_config = PathBuf::from(LOCAL_CONFIG_PATH);

    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    // Environment variables (MUCHAT_ prefix)
    figment = figment.merge(Env::prefixed(CONFIG_ENV_PREFIX));

    figment.extract().context("Failed to load configuration")
}

/// Load configuration from one explicit file, still honoring the environment
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Configuration file not found: {}", path.display());
    }

    Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(CONFIG_ENV_PREFIX))
        .extract()
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Per-user directory holding the global `config.toml`, created on demand
pub fn get_config_dir() -> Result<PathBuf> {
    let dir = match ProjectDirs::from("", "", "muchat") {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => BaseDirs::new()
            .map(|base| base.home_dir().join(".config").join("muchat"))
            .context("no home directory for the global configuration")?,
    };
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("cannot create {}", dir.display()))?;
    Ok(dir)
}

/// Write `config` as TOML; `None` targets the global file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let target = match path {
        Some(path) => path,
        None => get_config_dir()?.join("config.toml"),
    };
    let rendered = toml::to_string_pretty(config)?;
    std::fs::write(&target, rendered)
        .with_context(|| format!("cannot write {}", target.display()))
}

const EXAMPLE_CONFIG: &str = r#"# MuChat bridge configuration
# Values here override the global file for this directory

muchat_api_key = "your-api-key"
agent_id = "your-agent-id"
enable_debug = false

# allow_all | allow_selected | block_selected | block_all
channel_access = "allow_all"
channel_allow_list = ""
channel_block_list = ""

# allow_all | allow_selected | block_selected
user_access = "block_selected"
user_block_list = "user-id-1, user-id-2"

# single_shot | incremental
reply_mode = "incremental"
stream = true
turn_timeout_secs = 60
"#;

/// Write the global defaults and a local example, skipping files that exist.
///
/// Returns the paths that were created.
pub fn init_config() -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let global = get_config_dir()?.join("config.toml");
    if !global.exists() {
        save_config(&Config::default(), Some(global.clone()))?;
        created.push(global);
    }

    let example = PathBuf::from(format!("{}.example", LOCAL_CONFIG_PATH));
    if !example.exists() {
        if let Some(dir) = example.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&example, EXAMPLE_CONFIG)?;
        created.push(example);
    }

    Ok(created)
}
