//! Archipelago network protocol. Every frame is a JSON array of commands.

use std::collections::HashMap;

use re4ap_lib::locations::GAME_NAME;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

pub const CLIENT_GOAL: u8 = 30;
/// Receive items from other worlds, from our own world and the starting inventory.
pub const ITEMS_HANDLING_ALL: u8 = 0b111;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub class: &'static str,
}

impl Default for NetworkVersion {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 5,
            build: 1,
            class: "Version",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Connect {
    pub game: String,
    pub name: String,
    pub uuid: String,
    pub version: NetworkVersion,
    pub items_handling: u8,
    pub tags: Vec<String>,
    pub password: String,
    pub slot_data: bool,
}

impl Connect {
    pub fn new(slot: &str, password: &str) -> Self {
        Self {
            game: GAME_NAME.to_owned(),
            name: slot.to_owned(),
            uuid: String::new(),
            version: NetworkVersion::default(),
            items_handling: ITEMS_HANDLING_ALL,
            tags: vec![],
            password: password.to_owned(),
            slot_data: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "cmd")]
pub enum ClientMessage {
    Connect(Connect),
    GetDataPackage { games: Vec<String> },
    LocationChecks { locations: Vec<i64> },
    StatusUpdate { status: u8 },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct RoomInfo {
    #[serde(default)]
    pub games: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct GameData {
    #[serde(default)]
    pub item_name_to_id: HashMap<String, i64>,
    #[serde(default)]
    pub location_name_to_id: HashMap<String, i64>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DataPackageData {
    #[serde(default)]
    pub games: HashMap<String, GameData>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct DataPackage {
    #[serde(default)]
    pub data: DataPackageData,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NetworkPlayer {
    #[serde(default)]
    pub team: i64,
    pub slot: i64,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Connected {
    #[serde(default)]
    pub team: i64,
    #[serde(default)]
    pub slot: i64,
    #[serde(default)]
    pub players: Vec<NetworkPlayer>,
    #[serde(default)]
    pub checked_locations: Vec<i64>,
    #[serde(default)]
    pub slot_data: Value,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct NetworkItem {
    pub item: i64,
    #[serde(default)]
    pub location: i64,
    #[serde(default)]
    pub player: i64,
    #[serde(default)]
    pub flags: i64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ReceivedItems {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub items: Vec<NetworkItem>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct PrintJson {
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct ConnectionRefused {
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "cmd")]
pub enum ServerMessage {
    RoomInfo(RoomInfo),
    DataPackage(DataPackage),
    Connected(Connected),
    ReceivedItems(ReceivedItems),
    #[serde(rename = "PrintJSON")]
    PrintJson(PrintJson),
    ConnectionRefused(ConnectionRefused),
    #[serde(other)]
    Unknown,
}

/// Decodes a frame; commands that do not decode are logged and dropped.
pub fn parse_frame(text: &str) -> Result<Vec<ServerMessage>, ProtocolError> {
    let commands: Vec<Value> = serde_json::from_str(text)?;
    Ok(commands
        .into_iter()
        .filter_map(|command| match serde_json::from_value(command) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!("dropped command: {}", err);
                None
            }
        })
        .collect())
}

pub fn encode_frame(message: &ClientMessage) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(&[message])?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_connect() {
        let frame = encode_frame(&ClientMessage::Connect(Connect::new("Leon", "pw"))).unwrap();
        let value: Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(
            value,
            json!([{
                "cmd": "Connect",
                "game": "Resident Evil 4 UHDE",
                "name": "Leon",
                "uuid": "",
                "version": { "major": 0, "minor": 5, "build": 1, "class": "Version" },
                "items_handling": 7,
                "tags": [],
                "password": "pw",
                "slot_data": true
            }])
        );
    }

    #[test]
    fn encodes_simple_commands() {
        let frame = encode_frame(&ClientMessage::LocationChecks {
            locations: vec![847001],
        })
        .unwrap();
        assert_eq!(frame, r#"[{"cmd":"LocationChecks","locations":[847001]}]"#);
        let frame = encode_frame(&ClientMessage::StatusUpdate {
            status: CLIENT_GOAL,
        })
        .unwrap();
        assert_eq!(frame, r#"[{"cmd":"StatusUpdate","status":30}]"#);
    }

    #[test]
    fn decodes_server_frames() {
        let frame = json!([
            { "cmd": "RoomInfo", "games": ["Resident Evil 4 UHDE", "Archipelago"], "version": {} },
            { "cmd": "ReceivedItems", "index": 2, "items": [{ "item": 847010, "location": 5, "player": 2, "flags": 1 }] },
            { "cmd": "PrintJSON", "data": [{ "text": "hi" }], "type": "Chat" },
            { "cmd": "Bounced", "data": {} },
            { "cmd": "ConnectionRefused", "errors": ["InvalidSlot"] },
            { "cmd": "ReceivedItems", "items": "broken" }
        ])
        .to_string();
        let messages = parse_frame(&frame).unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(
            messages[0],
            ServerMessage::RoomInfo(RoomInfo {
                games: vec!["Resident Evil 4 UHDE".to_owned(), "Archipelago".to_owned()],
            })
        );
        let ServerMessage::ReceivedItems(received) = &messages[1] else {
            panic!("{:?}", messages[1]);
        };
        assert_eq!(received.index, 2);
        assert_eq!(received.items[0].item, 847010);
        assert!(matches!(messages[2], ServerMessage::PrintJson(_)));
        assert_eq!(messages[3], ServerMessage::Unknown);
        assert!(matches!(messages[4], ServerMessage::ConnectionRefused(_)));
    }

    #[test]
    fn rejects_non_array_frames() {
        assert!(parse_frame(r#"{"cmd": "RoomInfo"}"#).is_err());
    }
}
