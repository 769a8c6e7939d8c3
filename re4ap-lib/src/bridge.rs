//! Text files shared by the game-side mod and the client.

use std::{
    fmt,
    fs::{self, OpenOptions},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

use derive_new::new;
use tracing::{debug, warn};

pub const INBOX_FILE: &str = "ap_inbox.txt";
pub const OUTBOX_FILE: &str = "ap_outbox.txt";
pub const STATUS_FILE: &str = "ap_status.txt";
pub const CONFIG_FILE: &str = "ap_config.txt";
const TAKING_SUFFIX: &str = ".taking";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientStatus {
    Connecting,
    Connected,
    Disconnected,
    Refused,
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ClientStatus::Connecting => "CONNECTING",
            ClientStatus::Connected => "CONNECTED",
            ClientStatus::Disconnected => "DISCONNECTED",
            ClientStatus::Refused => "REFUSED",
        })
    }
}

impl FromStr for ClientStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "CONNECTING" => Ok(ClientStatus::Connecting),
            "CONNECTED" => Ok(ClientStatus::Connected),
            "DISCONNECTED" => Ok(ClientStatus::Disconnected),
            "REFUSED" => Ok(ClientStatus::Refused),
            other => Err(BridgeError::UnknownStatus(other.to_owned())),
        }
    }
}

/// `server|slot|password|auto_connect`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub server: String,
    pub slot: String,
    pub password: String,
    pub auto_connect: bool,
}

impl ConnectionConfig {
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }
        let mut parts = content.split('|');
        let mut next = || parts.next().unwrap_or_default().to_owned();
        Some(Self {
            server: next(),
            slot: next(),
            password: next(),
            auto_connect: next().trim() == "1",
        })
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.server,
            self.slot,
            self.password,
            u8::from(self.auto_connect)
        )
    }
}

pub fn parse_id_list(content: &str) -> Vec<i64> {
    content
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| match part.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!("skipped invalid id '{}'", part);
                None
            }
        })
        .collect()
}

pub fn format_id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(new, Clone, Debug)]
pub struct Bridge {
    dir: PathBuf,
}

impl Bridge {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    fn read(&self, file_name: &str) -> Result<String, BridgeError> {
        let path = self.path(file_name);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content.trim().to_owned()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(BridgeError::Io { path, source }),
        }
    }

    fn write(&self, file_name: &str, content: &str) -> Result<(), BridgeError> {
        let path = self.path(file_name);
        fs::write(&path, content).map_err(|source| BridgeError::Io { path, source })
    }

    /// Appends without rewriting, so a concurrent take never sees stale ids.
    /// Each file has a single writer.
    fn append_ids(&self, file_name: &str, ids: &[i64]) -> Result<(), BridgeError> {
        if ids.is_empty() {
            return Ok(());
        }
        let path = self.path(file_name);
        let result = (|| {
            let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
            let separator = if file.metadata()?.len() > 0 { "," } else { "" };
            write!(file, "{}{}", separator, format_id_list(ids))
        })();
        result.map_err(|source| BridgeError::Io { path, source })
    }

    /// Reads and removes `path`. A missing file is empty.
    fn drain_file(path: &Path) -> Result<String, BridgeError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(String::new()),
            Err(source) => {
                return Err(BridgeError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        fs::remove_file(path).map_err(|source| BridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(content)
    }

    /// Moves the file aside before reading it, so ids appended meanwhile land in a new file.
    fn take_ids(&self, file_name: &str) -> Result<Vec<i64>, BridgeError> {
        let path = self.path(file_name);
        let taking = self.path(&format!("{}{}", file_name, TAKING_SUFFIX));
        // left over from an interrupted take
        let mut content = Self::drain_file(&taking)?;
        match fs::rename(&path, &taking) {
            Ok(()) => {
                content.push(',');
                content.push_str(&Self::drain_file(&taking)?);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(BridgeError::Io { path, source }),
        }
        let content = content.trim();
        if content.trim_matches(',').is_empty() {
            return Ok(vec![]);
        }
        debug!("{} raw content: '{}'", file_name, content);
        Ok(parse_id_list(content))
    }

    /// Client side: queue local item ids for the game.
    pub fn append_items(&self, ids: &[i64]) -> Result<(), BridgeError> {
        self.append_ids(INBOX_FILE, ids)
    }

    /// Game side: consume the queued items.
    pub fn take_items(&self) -> Result<Vec<i64>, BridgeError> {
        self.take_ids(INBOX_FILE)
    }

    /// Game side: report checked local location ids.
    pub fn append_locations(&self, ids: &[i64]) -> Result<(), BridgeError> {
        self.append_ids(OUTBOX_FILE, ids)
    }

    /// Client side: consume the reported locations.
    pub fn take_locations(&self) -> Result<Vec<i64>, BridgeError> {
        self.take_ids(OUTBOX_FILE)
    }

    pub fn write_status(&self, status: ClientStatus) -> Result<(), BridgeError> {
        self.write(STATUS_FILE, &status.to_string())
    }

    pub fn read_status(&self) -> Result<Option<ClientStatus>, BridgeError> {
        let content = self.read(STATUS_FILE)?;
        if content.is_empty() {
            return Ok(None);
        }
        content.parse().map(Some)
    }

    pub fn read_config(&self) -> Result<Option<ConnectionConfig>, BridgeError> {
        Ok(ConnectionConfig::parse(&self.read(CONFIG_FILE)?))
    }

    pub fn write_config(&self, config: &ConnectionConfig) -> Result<(), BridgeError> {
        self.write(CONFIG_FILE, &config.to_string())
    }
}
