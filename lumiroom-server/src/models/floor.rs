use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::Room;

/// Rooms of one floor, each behind its own lock so readings and decisions of
/// different rooms never contend.
#[derive(Debug, Default)]
pub struct Floor {
    pub rooms: HashMap<String, Arc<RwLock<Room>>>,
}

impl Floor {
    pub fn new() -> Self {
        Self::default()
    }
}
