//! Archipelago id space of the game.
//!
//! Ids exchanged with the game are local ids. The server sees `BASE_ID + local id`.

pub const BASE_ID: i64 = 847000;
pub const GAME_NAME: &str = "Resident Evil 4 UHDE";

const GOAL_MODE_FIRST: i64 = 10000;
const GOAL_MODE_LAST: i64 = 12199;
const GOAL_MODE_STRIDE: i64 = 100;
const VICTORY_OFFSET: i64 = 99;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameMode {
    pub id: u32,
    pub key: &'static str,
    pub name: &'static str,
}

pub const GAME_MODES: [GameMode; 5] = [
    GameMode {
        id: 0,
        key: "normal",
        name: "Main Game (Normal)",
    },
    GameMode {
        id: 1,
        key: "professional",
        name: "Main Game (Professional)",
    },
    GameMode {
        id: 2,
        key: "separate_ways",
        name: "Separate Ways",
    },
    GameMode {
        id: 3,
        key: "assignment_ada",
        name: "Assignment Ada",
    },
    GameMode {
        id: 4,
        key: "mercenaries",
        name: "The Mercenaries",
    },
];

pub fn to_ap_id(local_id: i64) -> i64 {
    local_id + BASE_ID
}

pub fn to_local_id(ap_id: i64) -> i64 {
    ap_id - BASE_ID
}

pub fn game_mode(mode_id: u32) -> Option<&'static GameMode> {
    GAME_MODES.iter().find(|mode| mode.id == mode_id)
}

pub fn game_mode_by_key(key: &str) -> Option<&'static GameMode> {
    GAME_MODES.iter().find(|mode| mode.key == key)
}

pub fn mode_name(mode_id: u32) -> String {
    game_mode(mode_id)
        .map(|mode| mode.name.to_owned())
        .unwrap_or_else(|| format!("Mode {}", mode_id))
}

/// Mode id of a goal-mode victory location.
pub fn victory_mode(local_id: i64) -> Option<u32> {
    if !(GOAL_MODE_FIRST..=GOAL_MODE_LAST).contains(&local_id) {
        return None;
    }
    let relative = local_id - GOAL_MODE_FIRST;
    if relative % GOAL_MODE_STRIDE != VICTORY_OFFSET {
        return None;
    }
    Some((relative / GOAL_MODE_STRIDE) as u32)
}

pub fn victory_location(mode_id: u32) -> i64 {
    GOAL_MODE_FIRST + mode_id as i64 * GOAL_MODE_STRIDE + VICTORY_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_between_id_spaces() {
        assert_eq!(to_ap_id(12), 847012);
        assert_eq!(to_local_id(847012), 12);
    }

    #[test]
    fn detects_victory_locations() {
        assert_eq!(victory_mode(10099), Some(0));
        assert_eq!(victory_mode(10299), Some(2));
        assert_eq!(victory_mode(12199), Some(21));
        assert_eq!(victory_mode(10098), None);
        assert_eq!(victory_mode(9999), None);
        assert_eq!(victory_mode(12299), None);
        assert_eq!(victory_location(3), 10399);
    }

    #[test]
    fn looks_up_modes() {
        assert_eq!(game_mode(2).unwrap().key, "separate_ways");
        assert_eq!(game_mode_by_key("mercenaries").unwrap().id, 4);
        assert_eq!(mode_name(4), "The Mercenaries");
        assert_eq!(mode_name(17), "Mode 17");
    }
}
