use std::{fs, io::ErrorKind, path::PathBuf};

use derive_new::new;
use re4ap_lib::bridge::{Bridge, ConnectionConfig};
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::{error, warn};

use crate::input::HotkeyAction;

const CONSOLE: &str = "console";
const BRIDGE: &str = "bridge";
const CONNECTION: &str = "connection";
const UPDATER: &str = "updater";
const HOTKEYS: &str = "hotkeys";
const REMAP: &str = "remap";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub console_enabled: bool,
    /// Empty means the directory of the DLL.
    pub bridge_directory: String,
    pub connection: ConnectionConfig,
    pub updater_enabled: bool,
    pub releases_url: String,
    pub hotkeys: Vec<(HotkeyAction, String)>,
    pub remaps: Vec<(String, String)>,
}

struct SettingsDocument {
    doc: DocumentMut,
    /// False when the file could not be parsed; it is then never overwritten.
    writable: bool,
    dirty: bool,
}

impl SettingsDocument {
    fn section(&mut self, section: &str) -> &mut Item {
        if self.doc.get(section).is_none() {
            self.doc.insert(section, Item::Table(Table::new()));
            self.dirty = true;
        }
        &mut self.doc[section]
    }

    /// Existing keys are never touched; a value of the wrong type falls back to `default`.
    fn lookup<T>(
        &mut self,
        section: &str,
        key: &str,
        default: T,
        read: impl Fn(&Item) -> Option<T>,
        write: impl Fn(&T) -> Item,
    ) -> T {
        match self.doc.get(section) {
            Some(table) if !table.is_table_like() => {
                warn!("{} must be a table, using defaults", section);
                return default;
            }
            Some(table) => {
                if let Some(item) = table.get(key) {
                    return read(item).unwrap_or_else(|| {
                        warn!("{}.{} has the wrong type, using the default", section, key);
                        default
                    });
                }
            }
            None => {}
        }
        if self.writable {
            self.section(section)[key] = write(&default);
            self.dirty = true;
        }
        default
    }

    fn string(&mut self, section: &str, key: &str, default: &str) -> String {
        self.lookup(
            section,
            key,
            default.to_owned(),
            |item| item.as_str().map(str::to_owned),
            |default| value(default.as_str()),
        )
    }

    fn bool(&mut self, section: &str, key: &str, default: bool) -> bool {
        self.lookup(section, key, default, Item::as_bool, |&default| value(default))
    }

    fn pairs(&mut self, section: &str) -> Vec<(String, String)> {
        if self.writable {
            self.section(section);
        }
        let Some(item) = self.doc.get(section) else {
            return vec![];
        };
        let Some(table) = item.as_table_like() else {
            warn!("{} must be a table", section);
            return vec![];
        };
        table
            .iter()
            .filter_map(|(key, item)| match item.as_str() {
                Some(target) => Some((key.to_owned(), target.to_owned())),
                None => {
                    warn!("{}.{} must be a string", section, key);
                    None
                }
            })
            .collect()
    }
}

#[derive(new)]
pub struct SettingsRepo {
    path: PathBuf,
}

impl SettingsRepo {
    fn load_document(&self) -> Option<DocumentMut> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => {
                warn!("failed to read {}: {}", self.path.display(), err);
                return None;
            }
        };
        match content.parse() {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(
                    "{} is broken, using defaults and leaving the file alone: {}",
                    self.path.display(),
                    err
                );
                None
            }
        }
    }

    /// Reads every setting, writing defaults for the missing ones back to the file.
    pub fn load(&self) -> Settings {
        let mut doc = match self.load_document() {
            Some(doc) => SettingsDocument {
                doc,
                writable: true,
                dirty: false,
            },
            None => SettingsDocument {
                doc: DocumentMut::new(),
                writable: false,
                dirty: false,
            },
        };
        let settings = Settings {
            console_enabled: doc.bool(CONSOLE, "enabled", false),
            bridge_directory: doc.string(BRIDGE, "directory", ""),
            connection: ConnectionConfig {
                server: doc.string(CONNECTION, "server", "archipelago.gg:38281"),
                slot: doc.string(CONNECTION, "slot", ""),
                password: doc.string(CONNECTION, "password", ""),
                auto_connect: doc.bool(CONNECTION, "auto_connect", false),
            },
            updater_enabled: doc.bool(UPDATER, "enabled", true),
            releases_url: doc.string(UPDATER, "releases_url", ""),
            hotkeys: vec![
                (
                    HotkeyAction::ToggleConsole,
                    doc.string(HOTKEYS, "toggle_console", "CTRL+F1"),
                ),
                (
                    HotkeyAction::ReloadConfig,
                    doc.string(HOTKEYS, "reload_config", "CTRL+F5"),
                ),
            ],
            remaps: doc.pairs(REMAP),
        };
        if doc.dirty {
            if let Err(err) = fs::write(&self.path, doc.doc.to_string()) {
                error!("failed to write {}: {}", self.path.display(), err);
            }
        }
        settings
    }
}

/// `ap_config.txt`, written by the client or the in-game menu, wins over the settings file.
pub fn read_connection(settings: &Settings, bridge: &Bridge) -> ConnectionConfig {
    match bridge.read_config() {
        Ok(Some(config)) => config,
        Ok(None) => settings.connection.clone(),
        Err(err) => {
            warn!("{}", err);
            settings.connection.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_defaults_for_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinput8.toml");
        let settings = SettingsRepo::new(path.clone()).load();

        assert!(!settings.console_enabled);
        assert_eq!(settings.connection.server, "archipelago.gg:38281");
        assert!(settings.updater_enabled);
        assert_eq!(
            settings.hotkeys[0],
            (HotkeyAction::ToggleConsole, "CTRL+F1".to_owned())
        );
        assert!(settings.remaps.is_empty());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("[connection]"));
        assert!(written.contains("toggle_console = \"CTRL+F1\""));
        assert_eq!(SettingsRepo::new(path).load(), settings);
    }

    #[test]
    fn keeps_user_values_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinput8.toml");
        fs::write(
            &path,
            "# my settings\n[console]\nenabled = true\n\n[connection]\nslot = \"Leon\"\n\n[remap]\nQ = \"E\"\nbad = 1\n",
        )
        .unwrap();

        let settings = SettingsRepo::new(path.clone()).load();
        assert!(settings.console_enabled);
        assert_eq!(settings.connection.slot, "Leon");
        assert_eq!(settings.remaps, vec![("Q".to_owned(), "E".to_owned())]);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# my settings"));
        assert!(written.contains("server = \"archipelago.gg:38281\""));
    }

    #[test]
    fn keeps_a_section_of_the_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinput8.toml");
        fs::write(&path, "console = 3\n").unwrap();
        assert!(!SettingsRepo::new(path.clone()).load().console_enabled);
        assert!(fs::read_to_string(&path).unwrap().starts_with("console = 3\n"));
    }

    #[test]
    fn keeps_values_of_the_wrong_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinput8.toml");
        fs::write(&path, "[console]\nenabled = \"yes\"\n").unwrap();
        assert!(!SettingsRepo::new(path.clone()).load().console_enabled);

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("enabled = \"yes\""));
        assert!(!written.contains("enabled = false"));
    }

    #[test]
    fn never_overwrites_a_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dinput8.toml");
        let broken = "# my notes\n[connection]\nslot = \"Leon\"\nserver = \"my.host:1\n";
        fs::write(&path, broken).unwrap();

        let settings = SettingsRepo::new(path.clone()).load();
        assert_eq!(settings.connection.server, "archipelago.gg:38281");
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn bridge_config_overrides_settings() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsRepo::new(dir.path().join("dinput8.toml")).load();
        let bridge = Bridge::new(dir.path().to_path_buf());
        assert_eq!(read_connection(&settings, &bridge), settings.connection);

        fs::write(dir.path().join("ap_config.txt"), "localhost:38281|Ada|secret|1").unwrap();
        let connection = read_connection(&settings, &bridge);
        assert_eq!(connection.slot, "Ada");
        assert!(connection.auto_connect);
    }
}
