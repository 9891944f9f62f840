//! Topic layout of the building bus.
//!
//! ```text
//! building/{floor}/{room}/light_sensor     sensor readings
//! building/{floor}/{room}/room_controller  controller decisions
//! building/status/{client_id}              retained last will
//! ```

pub const ROOT: &str = "building";

pub fn sensor_topic(floor: &str, room: &str) -> String {
    format!("{ROOT}/{floor}/{room}/light_sensor")
}

pub fn controller_topic(floor: &str, room: &str) -> String {
    format!("{ROOT}/{floor}/{room}/room_controller")
}

pub fn status_topic(client_id: &str) -> String {
    format!("{ROOT}/status/{client_id}")
}

/// Whether `name` can stand as a single topic level of a published topic.
///
/// Empty names, separators and wildcards would let one room's topics
/// overlap with another's.
pub fn is_valid_level(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '+', '#'])
}

/// Matches a topic name against an MQTT topic filter.
///
/// `+` matches exactly one level, a trailing `#` matches the parent level
/// and everything below it.
pub fn matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
