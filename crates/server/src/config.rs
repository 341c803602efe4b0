use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use recoil::{Arena, LinkConditions, MovementConfig, RoomConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ArenaKind {
    Flat,
    ProvingGround,
}

impl ArenaKind {
    pub fn build(self) -> Arena {
        match self {
            ArenaKind::Flat => Arena::flat(),
            ArenaKind::ProvingGround => Arena::proving_ground(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub tick_rate: u32,
    pub rooms: Vec<String>,
    pub max_slots: u8,
    pub arena: ArenaKind,
    pub bots: usize,
    /// Run time before a clean shutdown; `None` runs until interrupted.
    pub duration_secs: Option<u64>,
    /// Conditions applied to each direction of every bot link.
    pub link: LinkConditions,
    pub seed: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50,
            rooms: vec!["arena".to_owned()],
            max_slots: 10,
            arena: ArenaKind::ProvingGround,
            bots: 0,
            duration_secs: None,
            link: LinkConditions::default(),
            seed: 0x5eed,
        }
    }
}

impl ServerConfig {
    pub fn movement(&self) -> MovementConfig {
        MovementConfig {
            tick_rate: self.tick_rate.max(1),
            ..MovementConfig::default()
        }
    }

    /// Room names with duplicates removed, falling back to a single default room.
    pub fn room_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in &self.rooms {
            let name = name.trim();
            if !name.is_empty() && !names.iter().any(|n| n == name) {
                names.push(name.to_owned());
            }
        }
        if names.is_empty() {
            names.push("arena".to_owned());
        }
        names
    }

    pub fn room_config(&self, name: &str) -> RoomConfig {
        RoomConfig {
            max_slots: self.max_slots,
            movement: self.movement(),
            ..RoomConfig::named(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_names_are_deduplicated() {
        let config = ServerConfig {
            rooms: vec!["a".into(), " b ".into(), "a".into(), "".into()],
            ..Default::default()
        };
        assert_eq!(config.room_names(), vec!["a", "b"]);

        let empty = ServerConfig {
            rooms: Vec::new(),
            ..Default::default()
        };
        assert_eq!(empty.room_names(), vec!["arena"]);
    }

    #[test]
    fn room_config_follows_server_settings() {
        let config = ServerConfig {
            tick_rate: 30,
            max_slots: 4,
            ..Default::default()
        };
        let room = config.room_config("yard");

        assert_eq!(room.name, "yard");
        assert_eq!(room.max_slots, 4);
        assert_eq!(room.movement.tick_rate, 30);
    }
}
