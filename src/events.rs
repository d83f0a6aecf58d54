//! Input events delivered to the page controllers

use crate::dom::NodeId;

/// Keys the controllers care about. Everything else is carried through
/// as `Other` so handlers can ignore it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Escape,
    Tab,
    Other(String),
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_name(name: &str) -> Key {
        match name {
            "Enter" => Key::Enter,
            " " | "Space" | "Spacebar" => Key::Space,
            "Escape" | "Esc" => Key::Escape,
            "Tab" => Key::Tab,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Click,
    KeyDown { key: Key, shift: bool },
}

/// A dispatched event. Handlers may cancel the default action the page
/// would otherwise perform.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub target: NodeId,
    default_prevented: bool,
}

impl Event {
    pub fn click(target: NodeId) -> Self {
        Self {
            kind: EventKind::Click,
            target,
            default_prevented: false,
        }
    }

    pub fn key_down(target: NodeId, key: Key, shift: bool) -> Self {
        Self {
            kind: EventKind::KeyDown { key, shift },
            target,
            default_prevented: false,
        }
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_names_map_like_keyboard_event() {
        assert_eq!(Key::from_name(" "), Key::Space);
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("a"), Key::Other("a".into()));
    }
}
