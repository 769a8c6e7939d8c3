use std::{collections::HashMap, fmt};

use tracing::warn;

pub const VK_SHIFT: u16 = 0x10;
pub const VK_CONTROL: u16 = 0x11;
pub const VK_MENU: u16 = 0x12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InputError {
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("hotkey '{0}' has no key")]
    MissingKey(String),
    #[error("hotkey '{0}' has more than one key")]
    MultipleKeys(String),
}

/// Key names used in the settings file and their virtual-key codes.
pub struct KeyMap {
    by_name: HashMap<String, u16>,
    by_code: HashMap<u16, String>,
}

impl KeyMap {
    pub fn new() -> Self {
        let mut key_map = Self {
            by_name: HashMap::new(),
            by_code: HashMap::new(),
        };
        for c in b'A'..=b'Z' {
            key_map.insert(&(c as char).to_string(), c as u16);
        }
        for c in b'0'..=b'9' {
            key_map.insert(&(c as char).to_string(), c as u16);
            key_map.insert(&format!("NUMPAD{}", c as char), 0x60 + (c - b'0') as u16);
        }
        for i in 1..=24u16 {
            key_map.insert(&format!("F{}", i), 0x6f + i);
        }
        let named = [
            ("LBUTTON", 0x01),
            ("RBUTTON", 0x02),
            ("MBUTTON", 0x04),
            ("XBUTTON1", 0x05),
            ("XBUTTON2", 0x06),
            ("BACKSPACE", 0x08),
            ("TAB", 0x09),
            ("ENTER", 0x0d),
            ("SHIFT", VK_SHIFT),
            ("CTRL", VK_CONTROL),
            ("ALT", VK_MENU),
            ("PAUSE", 0x13),
            ("CAPSLOCK", 0x14),
            ("ESC", 0x1b),
            ("SPACE", 0x20),
            ("PAGEUP", 0x21),
            ("PAGEDOWN", 0x22),
            ("END", 0x23),
            ("HOME", 0x24),
            ("LEFT", 0x25),
            ("UP", 0x26),
            ("RIGHT", 0x27),
            ("DOWN", 0x28),
            ("INSERT", 0x2d),
            ("DELETE", 0x2e),
            ("MULTIPLY", 0x6a),
            ("ADD", 0x6b),
            ("SUBTRACT", 0x6d),
            ("DECIMAL", 0x6e),
            ("DIVIDE", 0x6f),
            ("LSHIFT", 0xa0),
            ("RSHIFT", 0xa1),
            ("LCTRL", 0xa2),
            ("RCTRL", 0xa3),
            ("LALT", 0xa4),
            ("RALT", 0xa5),
            (";", 0xba),
            ("=", 0xbb),
            (",", 0xbc),
            ("-", 0xbd),
            (".", 0xbe),
            ("/", 0xbf),
            ("`", 0xc0),
            ("[", 0xdb),
            ("\\", 0xdc),
            ("]", 0xdd),
            ("'", 0xde),
        ];
        for (name, code) in named {
            key_map.insert(name, code);
        }
        for (alias, name) in [
            ("CONTROL", "CTRL"),
            ("MENU", "ALT"),
            ("RETURN", "ENTER"),
            ("ESCAPE", "ESC"),
            ("PGUP", "PAGEUP"),
            ("PGDN", "PAGEDOWN"),
        ] {
            let code = key_map.by_name[name];
            key_map.by_name.insert(alias.to_owned(), code);
        }
        key_map
    }

    fn insert(&mut self, name: &str, code: u16) {
        self.by_name.insert(name.to_owned(), code);
        self.by_code.entry(code).or_insert_with(|| name.to_owned());
    }

    pub fn code(&self, name: &str) -> Option<u16> {
        self.by_name.get(&name.trim().to_ascii_uppercase()).copied()
    }

    pub fn name(&self, code: u16) -> Option<&str> {
        self.by_code.get(&code).map(|name| name.as_str())
    }
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key: u16,
}

impl Hotkey {
    pub fn parse(key_map: &KeyMap, text: &str) -> Result<Self, InputError> {
        let mut modifiers = Modifiers::default();
        let mut key = None;
        for part in text.split('+').map(str::trim).filter(|part| !part.is_empty()) {
            let code = key_map
                .code(part)
                .ok_or_else(|| InputError::UnknownKey(part.to_owned()))?;
            match code {
                VK_CONTROL => modifiers.ctrl = true,
                VK_SHIFT => modifiers.shift = true,
                VK_MENU => modifiers.alt = true,
                _ if key.is_some() => return Err(InputError::MultipleKeys(text.to_owned())),
                _ => key = Some(code),
            }
        }
        let key = key.ok_or_else(|| InputError::MissingKey(text.to_owned()))?;
        Ok(Self { modifiers, key })
    }

    pub fn is_pressed(&self, is_down: impl Fn(u16) -> bool) -> bool {
        is_down(self.key)
            && (!self.modifiers.ctrl || is_down(VK_CONTROL))
            && (!self.modifiers.shift || is_down(VK_SHIFT))
            && (!self.modifiers.alt || is_down(VK_MENU))
    }

    pub fn display<'a>(&'a self, key_map: &'a KeyMap) -> HotkeyDisplay<'a> {
        HotkeyDisplay {
            hotkey: self,
            key_map,
        }
    }
}

pub struct HotkeyDisplay<'a> {
    hotkey: &'a Hotkey,
    key_map: &'a KeyMap,
}

impl fmt::Display for HotkeyDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.hotkey.modifiers;
        for (enabled, name) in [
            (modifiers.ctrl, "CTRL"),
            (modifiers.shift, "SHIFT"),
            (modifiers.alt, "ALT"),
        ] {
            if enabled {
                write!(f, "{}+", name)?;
            }
        }
        match self.key_map.name(self.hotkey.key) {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#04x}", self.hotkey.key),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleConsole,
    ReloadConfig,
}

/// Fires each action once per key press.
#[derive(Default)]
pub struct HotkeyWatcher {
    bindings: Vec<(Hotkey, HotkeyAction, bool)>,
}

impl HotkeyWatcher {
    pub fn bind(&mut self, hotkey: Hotkey, action: HotkeyAction) {
        self.bindings.push((hotkey, action, false));
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn poll(&mut self, is_down: impl Fn(u16) -> bool) -> Vec<HotkeyAction> {
        self.bindings
            .iter_mut()
            .filter_map(|(hotkey, action, was_pressed)| {
                let pressed = hotkey.is_pressed(&is_down);
                let fired = pressed && !*was_pressed;
                *was_pressed = pressed;
                fired.then_some(*action)
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemapTable(HashMap<u16, u16>);

impl RemapTable {
    pub fn parse<'a>(
        key_map: &KeyMap,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, InputError> {
        let lookup = |name: &str| {
            key_map
                .code(name)
                .ok_or_else(|| InputError::UnknownKey(name.to_owned()))
        };
        let mut table = HashMap::new();
        for (from, to) in pairs {
            table.insert(lookup(from)?, lookup(to)?);
        }
        Ok(Self(table))
    }

    pub fn translate(&self, code: u16) -> Option<u16> {
        self.0.get(&code).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Keys whose scan code needs the extended flag when injected.
pub fn is_extended_key(code: u16) -> bool {
    matches!(
        code,
        0x21..=0x28 | 0x2c | 0x2d | 0x2e | 0x5b | 0x5c | 0x5d | 0x6f | 0x90 | 0xa3 | 0xa5
    )
}

/// Builds the hotkey bindings, skipping entries that fail to parse.
pub fn hotkey_watcher(key_map: &KeyMap, hotkeys: &[(HotkeyAction, String)]) -> HotkeyWatcher {
    let mut watcher = HotkeyWatcher::default();
    for (action, text) in hotkeys {
        if text.trim().is_empty() {
            continue;
        }
        match Hotkey::parse(key_map, text) {
            Ok(hotkey) => watcher.bind(hotkey, *action),
            Err(err) => warn!("hotkey for {:?} ignored: {}", action, err),
        }
    }
    watcher
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn key_map_lookups() {
        let key_map = KeyMap::new();
        assert_eq!(key_map.code("f1"), Some(0x70));
        assert_eq!(key_map.code("F24"), Some(0x87));
        assert_eq!(key_map.code(" a "), Some(0x41));
        assert_eq!(key_map.code("numpad5"), Some(0x65));
        assert_eq!(key_map.code("Escape"), key_map.code("ESC"));
        assert_eq!(key_map.code("nope"), None);
        assert_eq!(key_map.name(0x0d), Some("ENTER"));
    }

    #[test]
    fn marks_extended_keys() {
        let key_map = KeyMap::new();
        for name in ["UP", "LEFT", "INSERT", "DELETE", "HOME", "PGDN", "RCTRL", "RALT", "DIVIDE"] {
            assert!(is_extended_key(key_map.code(name).unwrap()), "{}", name);
        }
        for name in ["A", "LCTRL", "LALT", "ENTER", "NUMPAD8", "SPACE", "F1"] {
            assert!(!is_extended_key(key_map.code(name).unwrap()), "{}", name);
        }
    }

    #[test]
    fn parses_hotkeys() {
        let key_map = KeyMap::new();
        let hotkey = Hotkey::parse(&key_map, "ctrl+shift+F1").unwrap();
        assert!(hotkey.modifiers.ctrl && hotkey.modifiers.shift && !hotkey.modifiers.alt);
        assert_eq!(hotkey.key, 0x70);
        assert_eq!(hotkey.display(&key_map).to_string(), "CTRL+SHIFT+F1");

        assert_eq!(
            Hotkey::parse(&key_map, "CTRL"),
            Err(InputError::MissingKey("CTRL".to_owned()))
        );
        assert_eq!(
            Hotkey::parse(&key_map, "A+B"),
            Err(InputError::MultipleKeys("A+B".to_owned()))
        );
        assert_eq!(
            Hotkey::parse(&key_map, "CTRL+WHAT"),
            Err(InputError::UnknownKey("WHAT".to_owned()))
        );
    }

    #[test]
    fn watcher_fires_on_press_edge() {
        let key_map = KeyMap::new();
        let mut watcher = hotkey_watcher(
            &key_map,
            &[
                (HotkeyAction::ToggleConsole, "CTRL+F1".to_owned()),
                (HotkeyAction::ReloadConfig, "bogus".to_owned()),
                (HotkeyAction::ReloadConfig, String::new()),
            ],
        );
        let down = |keys: &[u16]| -> HashSet<u16> { keys.iter().copied().collect() };

        let only_f1 = down(&[0x70]);
        assert!(watcher.poll(|k| only_f1.contains(&k)).is_empty());

        let ctrl_f1 = down(&[VK_CONTROL, 0x70]);
        assert_eq!(
            watcher.poll(|k| ctrl_f1.contains(&k)),
            vec![HotkeyAction::ToggleConsole]
        );
        assert!(watcher.poll(|k| ctrl_f1.contains(&k)).is_empty());

        assert!(watcher.poll(|_| false).is_empty());
        assert_eq!(
            watcher.poll(|k| ctrl_f1.contains(&k)),
            vec![HotkeyAction::ToggleConsole]
        );
    }

    #[test]
    fn remap_table() {
        let key_map = KeyMap::new();
        let table = RemapTable::parse(&key_map, [("Q", "E"), ("capslock", "lctrl")]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.translate(0x51), Some(0x45));
        assert_eq!(table.translate(0x14), Some(0xa2));
        assert_eq!(table.translate(0x45), None);
        assert!(RemapTable::parse(&key_map, [("Q", "???")]).is_err());
    }
}
