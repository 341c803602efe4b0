use recoil::EntityId;

/// Lobby-level happenings reported to the main task.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    ClientConnected { entity_id: EntityId },
    ClientDisconnected { entity_id: EntityId },
    PlayerJoined {
        entity_id: EntityId,
        room: String,
        name: String,
    },
    PlayerLeft { entity_id: EntityId, room: String },
    JoinDenied { entity_id: EntityId, room: String },
}

impl ServerEvent {
    pub fn log(&self) {
        match self {
            ServerEvent::ClientConnected { entity_id } => {
                log::debug!("client {entity_id} connected");
            }
            ServerEvent::ClientDisconnected { entity_id } => {
                log::info!("client {entity_id} disconnected");
            }
            ServerEvent::PlayerJoined {
                entity_id,
                room,
                name,
            } => log::info!("{name} (entity {entity_id}) joined {room}"),
            ServerEvent::PlayerLeft { entity_id, room } => {
                log::info!("entity {entity_id} left {room}");
            }
            ServerEvent::JoinDenied { entity_id, room } => {
                log::warn!("entity {entity_id} was denied entry to {room}");
            }
        }
    }
}
