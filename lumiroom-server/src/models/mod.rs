mod floor;
mod room;
mod room_key;

pub use floor::Floor;
pub use room::Room;
pub use room_key::RoomKey;
