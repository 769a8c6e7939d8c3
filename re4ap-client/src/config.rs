use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use re4ap_lib::bridge::ConnectionConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const CONFIG_FILE_NAME: &str = ".re4_ap_client.json";
pub const DEFAULT_SERVER: &str = "archipelago.gg:38281";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server address is empty")]
    EmptyServer,
    #[error("slot name is empty")]
    EmptySlot,
    #[error("save path is empty")]
    EmptySavePath,
    #[error("save path does not exist: {0}")]
    MissingSavePath(PathBuf),
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClientConfig {
    pub server: String,
    pub slot: String,
    pub save_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            slot: String::new(),
            save_path: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// A missing or broken file yields the defaults.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            warn!("ignored {}: {}", path.display(), err);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.server.trim().is_empty() {
            return Err(ValidationError::EmptyServer);
        }
        if self.slot.trim().is_empty() {
            return Err(ValidationError::EmptySlot);
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(ValidationError::EmptySavePath);
        }
        if !self.save_path.is_dir() {
            return Err(ValidationError::MissingSavePath(self.save_path.clone()));
        }
        Ok(())
    }

    /// Takes over what the game wrote to `ap_config.txt`. Empty fields keep ours.
    pub fn apply_game_config(&mut self, game: &ConnectionConfig) {
        if !game.server.trim().is_empty() {
            self.server = game.server.trim().to_owned();
        }
        if !game.slot.trim().is_empty() {
            self.slot = game.slot.trim().to_owned();
        }
    }

    pub fn to_game_config(&self, password: &str) -> ConnectionConfig {
        ConnectionConfig {
            server: self.server.clone(),
            slot: self.slot.clone(),
            password: password.to_owned(),
            auto_connect: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_for_missing_or_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert_eq!(ClientConfig::load(&path), ClientConfig::default());
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ClientConfig::load(&path), ClientConfig::default());
    }

    #[test]
    fn saves_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = ClientConfig {
            server: "localhost:38281".to_owned(),
            slot: "Leon".to_owned(),
            save_path: dir.path().to_path_buf(),
        };
        config.save(&path).unwrap();
        assert_eq!(ClientConfig::load(&path), config);

        fs::write(&path, r#"{"slot": "Ada"}"#).unwrap();
        let partial = ClientConfig::load(&path);
        assert_eq!(partial.slot, "Ada");
        assert_eq!(partial.server, DEFAULT_SERVER);
    }

    #[test]
    fn validates_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig {
            server: "localhost".to_owned(),
            slot: "Leon".to_owned(),
            save_path: dir.path().to_path_buf(),
        };
        assert_eq!(config.validate(), Ok(()));

        config.slot = " ".to_owned();
        assert_eq!(config.validate(), Err(ValidationError::EmptySlot));
        config.slot = "Leon".to_owned();
        config.server = String::new();
        assert_eq!(config.validate(), Err(ValidationError::EmptyServer));
        config.server = "localhost".to_owned();
        config.save_path = PathBuf::new();
        assert_eq!(config.validate(), Err(ValidationError::EmptySavePath));
        config.save_path = dir.path().join("missing");
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingSavePath(dir.path().join("missing")))
        );
    }

    #[test]
    fn applies_game_config() {
        let mut config = ClientConfig::default();
        config.apply_game_config(&ConnectionConfig {
            server: String::new(),
            slot: "Ashley".to_owned(),
            password: "pw".to_owned(),
            auto_connect: true,
        });
        assert_eq!(config.server, DEFAULT_SERVER);
        assert_eq!(config.slot, "Ashley");

        config.apply_game_config(&ConnectionConfig {
            server: "localhost:1".to_owned(),
            slot: "Leon".to_owned(),
            ..Default::default()
        });
        assert_eq!(config.server, "localhost:1");
        assert_eq!(config.to_game_config("pw").to_string(), "localhost:1|Leon|pw|0");

        config.apply_game_config(&ConnectionConfig {
            server: "localhost:2".to_owned(),
            slot: "  ".to_owned(),
            ..Default::default()
        });
        assert_eq!(config.server, "localhost:2");
        assert_eq!(config.slot, "Leon");
    }
}
