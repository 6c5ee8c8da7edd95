use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::config::{Config, ReplyMode};
use crate::access::AccessMode;
use crate::utils::MuChatError;

/// Immutable, fully derived configuration used by one or more turns
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    pub api_key: String,
    pub agent_id: String,
    pub debug: bool,
    pub channel_access: AccessMode,
    pub channel_allow: HashSet<String>,
    pub channel_block: HashSet<String>,
    pub user_access: AccessMode,
    pub user_allow: HashSet<String>,
    pub user_block: HashSet<String>,
    pub reply_mode: ReplyMode,
    pub stream: bool,
    pub api_base: String,
    pub turn_timeout: Duration,
}

impl ConfigSnapshot {
    /// Validate the raw config and derive every computed field from it
    pub fn derive(config: &Config) -> Result<Self, MuChatError> {
        config.validate()?;

        let channel_access: AccessMode = config.channel_access.parse()?;
        let user_access: AccessMode = config.user_access.parse()?;
        if user_access == AccessMode::BlockAll {
            return Err(MuChatError::Config(
                "block_all is only available for channel access".to_string(),
            ));
        }

        Ok(Self {
            api_key: config.muchat_api_key.trim().to_string(),
            agent_id: config.agent_id.trim().to_string(),
            debug: config.enable_debug,
            channel_access,
            channel_allow: split_ids(&config.channel_allow_list),
            channel_block: split_ids(&config.channel_block_list),
            user_access,
            user_allow: split_ids(&config.user_allow_list),
            user_block: split_ids(&config.user_block_list),
            reply_mode: config.reply_mode,
            stream: config.stream,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            turn_timeout: Duration::from_secs(config.turn_timeout_secs),
        })
    }

    /// Credential with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let visible: String = self
            .api_key
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("****{}", visible)
    }
}

/// Split a comma-separated id list, dropping blanks
fn split_ids(list: &str) -> HashSet<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Process-wide holder of the active snapshot.
///
/// Readers clone the `Arc` under a read lock and release it immediately, so a
/// replacement never waits on network I/O and a turn keeps the snapshot it
/// captured for its whole lifetime.
pub struct ConfigStore {
    inner: RwLock<Versioned>,
}

struct Versioned {
    version: u64,
    snapshot: Arc<ConfigSnapshot>,
}

impl ConfigStore {
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            inner: RwLock::new(Versioned {
                version: 1,
                snapshot: Arc::new(snapshot),
            }),
        }
    }

    /// Build a store from raw config, failing if it does not validate
    pub fn from_config(config: &Config) -> Result<Self, MuChatError> {
        Ok(Self::new(ConfigSnapshot::derive(config)?))
    }

    /// The snapshot in effect right now
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.inner.read().snapshot)
    }

    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    /// Publish a new snapshot, returning its version
    pub fn replace(&self, snapshot: ConfigSnapshot) -> u64 {
        let snapshot = Arc::new(snapshot);
        let mut inner = self.inner.write();
        inner.version += 1;
        inner.snapshot = snapshot;
        inner.version
    }

    /// Derive and publish; on error the current snapshot stays active
    pub fn apply(&self, config: &Config) -> Result<u64, MuChatError> {
        let snapshot = ConfigSnapshot::derive(config)?;
        Ok(self.replace(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_config() -> Config {
        Config {
            muchat_api_key: "secret-key".to_string(),
            agent_id: "agent-1".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_derive_splits_and_trims_lists() {
        let mut config = valid_config();
        config.channel_allow_list = " c1, c2 ,,c3 ".to_string();
        config.user_block_list = "u1,".to_string();

        let snapshot = ConfigSnapshot::derive(&config).unwrap();
        let expected: HashSet<String> = ["c1", "c2", "c3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(snapshot.channel_allow, expected);
        assert_eq!(snapshot.user_block.len(), 1);
        assert!(snapshot.user_block.contains("u1"));
        assert!(snapshot.channel_block.is_empty());
    }

    #[test]
    fn test_block_all_rejected_for_users() {
        let mut config = valid_config();
        config.user_access = "block_all".to_string();
        assert!(ConfigSnapshot::derive(&config).is_err());

        config.user_access = "allow_all".to_string();
        config.channel_access = "block_all".to_string();
        let snapshot = ConfigSnapshot::derive(&config).unwrap();
        assert_eq!(snapshot.channel_access, AccessMode::BlockAll);
    }

    #[test]
    fn test_replace_bumps_version() {
        let store = ConfigStore::from_config(&valid_config()).unwrap();
        assert_eq!(store.version(), 1);

        let mut next = valid_config();
        next.agent_id = "agent-2".to_string();
        assert_eq!(store.apply(&next).unwrap(), 2);
        assert_eq!(store.current().agent_id, "agent-2");
    }

    #[test]
    fn test_invalid_apply_keeps_previous_snapshot() {
        let store = ConfigStore::from_config(&valid_config()).unwrap();
        let before = store.current();

        let mut broken = valid_config();
        broken.agent_id = String::new();
        assert!(store.apply(&broken).is_err());

        assert_eq!(store.version(), 1);
        assert!(Arc::ptr_eq(&before, &store.current()));
    }

    #[test]
    fn test_captured_snapshot_survives_replace() {
        let store = ConfigStore::from_config(&valid_config()).unwrap();
        let captured = store.current();

        let mut next = valid_config();
        next.agent_id = "agent-2".to_string();
        store.apply(&next).unwrap();

        assert_eq!(captured.agent_id, "agent-1");
        assert_eq!(store.current().agent_id, "agent-2");
    }

    #[test]
    fn test_masked_api_key() {
        let snapshot = ConfigSnapshot::derive(&valid_config()).unwrap();
        assert_eq!(snapshot.masked_api_key(), "****-key");
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(ConfigStore::from_config(&valid_config()).unwrap());

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..200 {
                    let mut config = valid_config();
                    config.agent_id = format!("agent-{}", i);
                    config.channel_allow_list = format!("chan-{}", i);
                    store.apply(&config).unwrap();
                }
            })
        };

        for _ in 0..200 {
            let snapshot = store.current();
            if let Some(n) = snapshot.agent_id.strip_prefix("agent-") {
                if n != "1" {
                    assert!(snapshot.channel_allow.contains(&format!("chan-{}", n)));
                }
            }
        }
        writer.join().unwrap();
    }
}
