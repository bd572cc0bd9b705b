// File: statusbot-common/src/models/status.rs

use std::fmt;
use serde::{Deserialize, Serialize};

/// Player counts reported by one successful status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub current_players: u32,
    pub max_players: u32,
}

impl StatusSnapshot {
    pub fn new(current_players: u32, max_players: u32) -> Self {
        Self { current_players, max_players }
    }

    /// The string shown in the bot's presence, e.g. `7/10 Players online`.
    pub fn presence_text(&self) -> String {
        format!("{}/{} Players online", self.current_players, self.max_players)
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.current_players, self.max_players)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_text_format() {
        assert_eq!(StatusSnapshot::new(7, 10).presence_text(), "7/10 Players online");
        assert_eq!(StatusSnapshot::new(0, 0).presence_text(), "0/0 Players online");
    }

    #[test]
    fn serializes_with_field_names() {
        let json = serde_json::to_value(StatusSnapshot::new(5, 32)).unwrap();
        assert_eq!(json["current_players"], 5);
        assert_eq!(json["max_players"], 32);
    }
}
