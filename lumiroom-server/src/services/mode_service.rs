use std::collections::HashMap;

use lumiroom_api::models::{Mode, ModeSnapshot};
use tokio::sync::RwLock;

use crate::errors::ModeError;
use crate::models::RoomKey;

#[derive(Debug)]
struct ModeTable {
    global: Mode,
    /// `None` inherits `global`
    overrides: HashMap<RoomKey, Option<Mode>>,
}

/// Decides whether a room's sensor runs in `test` or `normal` mode.
#[derive(Debug)]
pub struct ModeService {
    table: RwLock<ModeTable>,
}

impl ModeService {
    pub fn new(global: Mode) -> Self {
        Self {
            table: RwLock::new(ModeTable {
                global,
                overrides: HashMap::new(),
            }),
        }
    }

    pub fn parse(value: &str) -> Result<Mode, ModeError> {
        Ok(value.parse::<Mode>()?)
    }

    /// The room's explicit override if set, otherwise the global mode.
    pub async fn resolve(&self, floor: &str, room: &str) -> Mode {
        let table = self.table.read().await;

        table
            .overrides
            .get(&RoomKey::new(floor, room))
            .copied()
            .flatten()
            .unwrap_or(table.global)
    }

    pub async fn set_room_mode(&self, floor: &str, room: &str, mode: Mode) {
        let mut table = self.table.write().await;
        table.overrides.insert(RoomKey::new(floor, room), Some(mode));

        tracing::info!("mode of room {}:{} set to {}", floor, room, mode);
    }

    /// Forgets the room's override entirely.
    pub async fn remove_room(&self, floor: &str, room: &str) {
        self.table.write().await.overrides.remove(&RoomKey::new(floor, room));
    }

    /// Sets the building wide mode and resets every room override, so the
    /// change reaches all rooms until one is pinned again.
    pub async fn set_global_mode(&self, mode: Mode) {
        let mut table = self.table.write().await;
        table.global = mode;

        for value in table.overrides.values_mut() {
            *value = None;
        }

        tracing::info!("global mode set to {}, {} room overrides cleared", mode, table.overrides.len());
    }

    pub async fn global_mode(&self) -> Mode {
        self.table.read().await.global
    }

    pub async fn snapshot(&self) -> ModeSnapshot {
        let table = self.table.read().await;

        ModeSnapshot {
            global: table.global,
            rooms: table
                .overrides
                .iter()
                .map(|(key, mode)| (key.to_string(), *mode))
                .collect(),
        }
    }
}

impl Default for ModeService {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}
