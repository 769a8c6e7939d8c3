use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use re4ap_lib::{
    bridge::ClientStatus,
    locations::{game_mode, to_ap_id, to_local_id, victory_mode, GAME_NAME},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::protocol::{
    ClientMessage, Connect, Connected, ConnectionRefused, DataPackage, NetworkItem, ReceivedItems,
    RoomInfo, ServerMessage, CLIENT_GOAL,
};

const DEFAULT_GOAL_MODE: &str = "normal";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Send(ClientMessage),
    Status(ClientStatus),
}

/// A received item waiting to be written to the game inbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingItem {
    pub index: usize,
    pub item: i64,
}

/// Connection state of one websocket session. Pure; the runtime performs the actions it returns.
#[derive(Debug)]
pub struct Session {
    slot: String,
    password: String,
    connected: bool,
    team: i64,
    players: HashMap<i64, String>,
    item_names: HashMap<i64, String>,
    location_names: HashMap<i64, String>,
    all_item_names: HashMap<i64, String>,
    all_location_names: HashMap<i64, String>,
    checked_locations: HashSet<i64>,
    delivered_items: HashSet<usize>,
    item_queue: VecDeque<PendingItem>,
    goal_modes: BTreeSet<String>,
    completed_goal_modes: BTreeSet<String>,
    goal_reported: bool,
    death_link: bool,
}

impl Session {
    pub fn new(slot: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            slot: slot.into(),
            password: password.into(),
            connected: false,
            team: 0,
            players: HashMap::new(),
            item_names: HashMap::new(),
            location_names: HashMap::new(),
            all_item_names: HashMap::new(),
            all_location_names: HashMap::new(),
            checked_locations: HashSet::new(),
            delivered_items: HashSet::new(),
            item_queue: VecDeque::new(),
            goal_modes: BTreeSet::from([DEFAULT_GOAL_MODE.to_owned()]),
            completed_goal_modes: BTreeSet::new(),
            goal_reported: false,
            death_link: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn goal_modes(&self) -> &BTreeSet<String> {
        &self.goal_modes
    }

    pub fn completed_goal_modes(&self) -> &BTreeSet<String> {
        &self.completed_goal_modes
    }

    pub fn handle(&mut self, message: ServerMessage) -> Vec<Action> {
        match message {
            ServerMessage::RoomInfo(room_info) => self.on_room_info(room_info),
            ServerMessage::DataPackage(data_package) => {
                self.on_data_package(data_package);
                vec![]
            }
            ServerMessage::Connected(connected) => self.on_connected(connected),
            ServerMessage::ReceivedItems(received) => {
                self.on_received_items(received);
                vec![]
            }
            ServerMessage::PrintJson(print) => {
                info!("[Server] {}", self.render_print_json(&print.data));
                vec![]
            }
            ServerMessage::ConnectionRefused(refused) => self.on_connection_refused(refused),
            ServerMessage::Unknown => vec![],
        }
    }

    fn on_room_info(&mut self, room_info: RoomInfo) -> Vec<Action> {
        info!("Connected to server, authenticating as {}", self.slot);
        vec![
            Action::Send(ClientMessage::GetDataPackage {
                games: room_info.games,
            }),
            Action::Send(ClientMessage::Connect(Connect::new(
                &self.slot,
                &self.password,
            ))),
        ]
    }

    fn on_data_package(&mut self, data_package: DataPackage) {
        for (game, data) in data_package.data.games {
            let own = game == GAME_NAME;
            for (name, id) in data.item_name_to_id {
                if own {
                    self.item_names.insert(id, name.clone());
                }
                self.all_item_names.insert(id, name);
            }
            for (name, id) in data.location_name_to_id {
                if own {
                    self.location_names.insert(id, name.clone());
                }
                self.all_location_names.insert(id, name);
            }
        }
        info!(
            "Data package loaded: {} items, {} locations",
            self.all_item_names.len(),
            self.all_location_names.len()
        );
    }

    fn on_connected(&mut self, connected: Connected) -> Vec<Action> {
        self.connected = true;
        self.team = connected.team;
        self.checked_locations = connected
            .checked_locations
            .iter()
            .map(|&id| to_local_id(id))
            .collect();
        if let Some(modes) = connected
            .slot_data
            .get("goal_modes")
            .and_then(Value::as_array)
        {
            let modes: BTreeSet<String> = modes
                .iter()
                .filter_map(|mode| mode.as_str().map(str::to_owned))
                .collect();
            if !modes.is_empty() {
                self.goal_modes = modes;
            }
        }
        self.death_link = match connected.slot_data.get("death_link") {
            Some(Value::Bool(flag)) => *flag,
            Some(value) => value.as_i64().is_some_and(|flag| flag != 0),
            None => false,
        };
        self.completed_goal_modes = self
            .checked_locations
            .iter()
            .filter_map(|&id| victory_mode(id))
            .filter_map(|mode_id| game_mode(mode_id).map(|mode| mode.key.to_owned()))
            .filter(|key| self.goal_modes.contains(key))
            .collect();
        self.players = connected
            .players
            .into_iter()
            .filter(|player| player.team == self.team)
            .map(|player| (player.slot, player.name))
            .collect();

        info!(
            "Connected as {} (slot {}), {} locations already checked",
            self.slot,
            connected.slot,
            self.checked_locations.len()
        );
        info!(
            "Goal modes: {}",
            self.goal_modes.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        if self.death_link {
            warn!("DeathLink is enabled for this slot but deaths are not relayed");
        }
        vec![Action::Status(ClientStatus::Connected)]
    }

    fn on_received_items(&mut self, received: ReceivedItems) {
        for (i, NetworkItem { item, player, .. }) in received.items.into_iter().enumerate() {
            let index = received.index + i;
            if self.delivered_items.contains(&index)
                || self.item_queue.iter().any(|pending| pending.index == index)
            {
                continue;
            }
            info!(
                "Received {} from {}",
                self.item_name(item),
                self.player_name(player)
            );
            self.item_queue.push_back(PendingItem { index, item });
        }
    }

    fn on_connection_refused(&mut self, refused: ConnectionRefused) -> Vec<Action> {
        self.connected = false;
        warn!("Connection refused: {}", refused.errors.join(", "));
        vec![Action::Status(ClientStatus::Refused)]
    }

    /// Reports locations the game checked. Returns nothing for ids the server already knows.
    pub fn check_locations(&mut self, local_ids: &[i64]) -> Vec<Action> {
        if !self.connected {
            return vec![];
        }
        let new_ids: Vec<i64> = local_ids
            .iter()
            .copied()
            .filter(|&id| self.checked_locations.insert(id))
            .collect();
        if new_ids.is_empty() {
            return vec![];
        }
        let mut actions = vec![Action::Send(ClientMessage::LocationChecks {
            locations: new_ids.iter().map(|&id| to_ap_id(id)).collect(),
        })];
        for &id in &new_ids {
            info!("Checked {}", self.location_name(to_ap_id(id)));
            let Some(mode) = victory_mode(id).and_then(game_mode) else {
                continue;
            };
            if self.goal_modes.contains(mode.key)
                && self.completed_goal_modes.insert(mode.key.to_owned())
            {
                info!(
                    "Completed {} ({}/{})",
                    mode.name,
                    self.completed_goal_modes.len(),
                    self.goal_modes.len()
                );
            }
        }
        if !self.goal_reported && self.goal_modes.is_subset(&self.completed_goal_modes) {
            self.goal_reported = true;
            info!("All goal modes completed!");
            actions.push(Action::Send(ClientMessage::StatusUpdate {
                status: CLIENT_GOAL,
            }));
        }
        actions
    }

    pub fn has_pending_items(&self) -> bool {
        !self.item_queue.is_empty()
    }

    pub fn take_pending_items(&mut self) -> Vec<PendingItem> {
        self.item_queue.drain(..).collect()
    }

    /// Puts items that could not be written back at the front of the queue.
    pub fn requeue_items(&mut self, items: Vec<PendingItem>) {
        for item in items.into_iter().rev() {
            self.item_queue.push_front(item);
        }
    }

    pub fn mark_delivered(&mut self, items: &[PendingItem]) {
        self.delivered_items
            .extend(items.iter().map(|pending| pending.index));
    }

    pub fn item_name(&self, id: i64) -> String {
        self.all_item_names
            .get(&id)
            .or_else(|| self.item_names.get(&id))
            .cloned()
            .unwrap_or_else(|| format!("Unknown Item {}", id))
    }

    pub fn location_name(&self, id: i64) -> String {
        self.all_location_names
            .get(&id)
            .or_else(|| self.location_names.get(&id))
            .cloned()
            .unwrap_or_else(|| format!("Unknown Location {}", id))
    }

    pub fn player_name(&self, slot: i64) -> String {
        self.players
            .get(&slot)
            .cloned()
            .unwrap_or_else(|| format!("Player {}", slot))
    }

    pub fn render_print_json(&self, parts: &[Value]) -> String {
        parts.iter().map(|part| self.render_part(part)).collect()
    }

    fn render_part(&self, part: &Value) -> String {
        let Value::Object(fields) = part else {
            return match part {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
        };
        let text = fields.get("text").map(text_of).unwrap_or_default();
        let id = || text.parse::<i64>().ok();
        match fields.get("type").and_then(Value::as_str) {
            Some("player_id") => id().map(|id| self.player_name(id)),
            Some("item_id") => id().map(|id| self.item_name(id)),
            Some("location_id") => id().map(|id| self.location_name(id)),
            _ => None,
        }
        .unwrap_or(text)
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::protocol::parse_frame;

    fn message(value: Value) -> ServerMessage {
        parse_frame(&json!([value]).to_string())
            .unwrap()
            .pop()
            .unwrap()
    }

    fn connected_session(slot_data: Value, checked: &[i64]) -> Session {
        let mut session = Session::new("Leon", "");
        let actions = session.handle(message(json!({
            "cmd": "Connected",
            "team": 0,
            "slot": 1,
            "players": [
                { "team": 0, "slot": 1, "name": "Leon" },
                { "team": 0, "slot": 2, "name": "Ashley" },
                { "team": 1, "slot": 1, "name": "Krauser" }
            ],
            "checked_locations": checked,
            "slot_data": slot_data
        })));
        assert_eq!(actions, vec![Action::Status(ClientStatus::Connected)]);
        session
    }

    #[test]
    fn room_info_requests_data_package_and_connects() {
        let mut session = Session::new("Leon", "secret");
        let actions = session.handle(message(json!({
            "cmd": "RoomInfo",
            "games": ["Resident Evil 4 UHDE"]
        })));
        assert_eq!(
            actions,
            vec![
                Action::Send(ClientMessage::GetDataPackage {
                    games: vec!["Resident Evil 4 UHDE".to_owned()]
                }),
                Action::Send(ClientMessage::Connect(Connect::new("Leon", "secret"))),
            ]
        );
        assert!(!session.is_connected());
    }

    #[test]
    fn connected_reads_slot_data() {
        let session = connected_session(
            json!({ "goal_modes": ["normal", "separate_ways"], "death_link": 1 }),
            &[847001, 857099],
        );
        assert!(session.is_connected());
        assert!(session.death_link);
        assert_eq!(
            session.goal_modes().iter().cloned().collect::<Vec<_>>(),
            vec!["normal", "separate_ways"]
        );
        assert_eq!(
            session.completed_goal_modes().iter().cloned().collect::<Vec<_>>(),
            vec!["normal"]
        );
        assert_eq!(session.player_name(2), "Ashley");
        assert_eq!(session.player_name(7), "Player 7");
    }

    #[test]
    fn goal_modes_default_to_normal() {
        let session = connected_session(json!({}), &[]);
        assert_eq!(
            session.goal_modes().iter().cloned().collect::<Vec<_>>(),
            vec!["normal"]
        );
        assert!(!session.death_link);
    }

    #[test]
    fn checks_are_ignored_while_disconnected() {
        let mut session = Session::new("Leon", "");
        assert!(session.check_locations(&[1, 2]).is_empty());
    }

    #[test]
    fn checks_only_new_locations() {
        let mut session = connected_session(json!({}), &[847001]);
        let actions = session.check_locations(&[1, 2, 2, 3]);
        assert_eq!(
            actions,
            vec![Action::Send(ClientMessage::LocationChecks {
                locations: vec![847002, 847003]
            })]
        );
        assert!(session.check_locations(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn reports_goal_once_when_all_modes_complete() {
        let mut session = connected_session(
            json!({ "goal_modes": ["normal", "separate_ways"] }),
            &[],
        );
        let actions = session.check_locations(&[10099]);
        assert_eq!(actions.len(), 1);

        let actions = session.check_locations(&[10299, 5]);
        assert_eq!(
            actions,
            vec![
                Action::Send(ClientMessage::LocationChecks {
                    locations: vec![857299, 847005]
                }),
                Action::Send(ClientMessage::StatusUpdate {
                    status: CLIENT_GOAL
                }),
            ]
        );
        assert_eq!(session.check_locations(&[6]).len(), 1);
    }

    #[test]
    fn victory_of_other_mode_is_not_a_goal() {
        let mut session = connected_session(json!({}), &[]);
        let actions = session.check_locations(&[10199]);
        assert_eq!(actions.len(), 1);
        assert!(session.completed_goal_modes().is_empty());
    }

    #[test]
    fn received_items_are_deduplicated_by_index() {
        let mut session = connected_session(json!({}), &[]);
        let received = json!({
            "cmd": "ReceivedItems",
            "index": 0,
            "items": [
                { "item": 847010, "location": 1, "player": 2, "flags": 0 },
                { "item": 847011, "location": 2, "player": 2, "flags": 0 }
            ]
        });
        session.handle(message(received.clone()));
        session.handle(message(received.clone()));
        let items = session.take_pending_items();
        assert_eq!(
            items,
            vec![
                PendingItem {
                    index: 0,
                    item: 847010
                },
                PendingItem {
                    index: 1,
                    item: 847011
                },
            ]
        );
        session.mark_delivered(&items);
        session.handle(message(received));
        session.handle(message(json!({
            "cmd": "ReceivedItems",
            "index": 2,
            "items": [{ "item": 847012, "location": 3, "player": 1, "flags": 0 }]
        })));
        assert_eq!(
            session.take_pending_items(),
            vec![PendingItem {
                index: 2,
                item: 847012
            }]
        );
    }

    #[test]
    fn requeued_items_keep_their_order() {
        let mut session = connected_session(json!({}), &[]);
        session.handle(message(json!({
            "cmd": "ReceivedItems",
            "index": 0,
            "items": [{ "item": 847010 }, { "item": 847011 }]
        })));
        let items = session.take_pending_items();
        assert!(!session.has_pending_items());
        session.requeue_items(items.clone());
        assert_eq!(session.take_pending_items(), items);
    }

    #[test]
    fn connection_refused_reports_status() {
        let mut session = Session::new("Leon", "");
        let actions = session.handle(message(json!({
            "cmd": "ConnectionRefused",
            "errors": ["InvalidSlot", "InvalidPassword"]
        })));
        assert_eq!(actions, vec![Action::Status(ClientStatus::Refused)]);
        assert!(!session.is_connected());
    }

    #[test]
    fn renders_print_json_with_names() {
        let mut session = connected_session(json!({}), &[]);
        session.handle(message(json!({
            "cmd": "DataPackage",
            "data": { "games": {
                "Resident Evil 4 UHDE": {
                    "item_name_to_id": { "Rocket Launcher": 847010 },
                    "location_name_to_id": { "Village Chief": 847001 }
                },
                "Other": {
                    "item_name_to_id": { "Sword": 1 },
                    "location_name_to_id": {}
                }
            }}
        })));
        let text = session.render_print_json(&[
            json!({ "type": "player_id", "text": "2" }),
            json!({ "text": " found " }),
            json!({ "type": "item_id", "text": "847010" }),
            json!({ "text": " and " }),
            json!({ "type": "item_id", "text": "1" }),
            json!({ "text": " at " }),
            json!({ "type": "location_id", "text": "847001" }),
            json!({ "text": " / " }),
            json!({ "type": "location_id", "text": "999" }),
            json!(" "),
            json!({ "type": "item_id", "text": "not a number" }),
        ]);
        assert_eq!(
            text,
            "Ashley found Rocket Launcher and Sword at Village Chief / Unknown Location 999 not a number"
        );
        assert_eq!(session.item_name(5), "Unknown Item 5");
    }
}
