// src/models/server.rs

// Live status decoded from one successful query reply. Name and map come
// back Latin-1 with a trailing framing byte already stripped by the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
    pub players: i32,
    pub max_players: i32,
}
