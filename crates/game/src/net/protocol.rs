use glam::{Quat, Vec3};
use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::snapshot::{
    EntityState, HealthUpdate, InputSample, KeyFlags, Snapshot, SpawnInfo, sanitize_look,
};

const TAG_LEN: usize = 2;

/// Message tags; the numeric ranges group lobby traffic (1xx) and in-game
/// traffic (2xx).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    JoinRoom = 100,
    JoinRoomDenied = 101,
    JoinRoomAccepted = 102,
    RoomList = 103,
    GameJoin = 200,
    GameStart = 201,
    GameUpdate = 202,
    PlayerInput = 203,
    LeaveRoom = 204,
}

impl Tag {
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            100 => Tag::JoinRoom,
            101 => Tag::JoinRoomDenied,
            102 => Tag::JoinRoomAccepted,
            103 => Tag::RoomList,
            200 => Tag::GameJoin,
            201 => Tag::GameStart,
            202 => Tag::GameUpdate,
            203 => Tag::PlayerInput,
            204 => Tag::LeaveRoom,
            _ => return None,
        })
    }

    pub fn is_lobby(self) -> bool {
        (self as u16) < 200
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct StateData {
    pub entity_id: u32,
    pub position: [f32; 3],
    pub look: [f32; 4],
    pub vertical_velocity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InputData {
    pub keys: u8,
    pub look: [f32; 4],
    pub fire_tick: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct SpawnData {
    pub entity_id: u32,
    pub name: String,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct HealthData {
    pub entity_id: u32,
    pub health: u8,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct SnapshotData {
    pub tick: u32,
    pub spawns: Vec<SpawnData>,
    pub despawns: Vec<u32>,
    pub updates: Vec<StateData>,
    pub health_updates: Vec<HealthData>,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct GameStartData {
    pub server_tick: u32,
    pub players: Vec<SpawnData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct RoomInfo {
    pub name: String,
    pub occupied: u8,
    pub max_slots: u8,
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Message {
    JoinRoom { room: String, name: String },
    JoinRoomDenied { rooms: Vec<RoomInfo> },
    JoinRoomAccepted { room: String },
    RoomList(Vec<RoomInfo>),
    GameJoin,
    GameStart(GameStartData),
    GameUpdate(SnapshotData),
    PlayerInput(InputData),
    LeaveRoom,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("packet of {0} bytes is too short for a tag")]
    Truncated(usize),
    #[error("unknown message tag {0}")]
    UnknownTag(u16),
    #[error("tag {tag:?} does not match payload {payload:?}")]
    TagMismatch { tag: Tag, payload: Tag },
}

impl Message {
    pub fn tag(&self) -> Tag {
        match self {
            Message::JoinRoom { .. } => Tag::JoinRoom,
            Message::JoinRoomDenied { .. } => Tag::JoinRoomDenied,
            Message::JoinRoomAccepted { .. } => Tag::JoinRoomAccepted,
            Message::RoomList(_) => Tag::RoomList,
            Message::GameJoin => Tag::GameJoin,
            Message::GameStart(_) => Tag::GameStart,
            Message::GameUpdate(_) => Tag::GameUpdate,
            Message::PlayerInput(_) => Tag::PlayerInput,
            Message::LeaveRoom => Tag::LeaveRoom,
        }
    }

    /// Little-endian tag followed by the archived message.
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let archived = rkyv::to_bytes::<rancor::Error>(self).map_err(PacketError::Serialize)?;
        let mut bytes = Vec::with_capacity(TAG_LEN + archived.len());
        bytes.extend_from_slice(&(self.tag() as u16).to_le_bytes());
        bytes.extend_from_slice(&archived);
        Ok(bytes)
    }

    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let (tag_bytes, payload) = data
            .split_first_chunk::<TAG_LEN>()
            .ok_or(PacketError::Truncated(data.len()))?;
        let raw_tag = u16::from_le_bytes(*tag_bytes);
        let tag = Tag::from_u16(raw_tag).ok_or(PacketError::UnknownTag(raw_tag))?;

        let mut aligned = AlignedVec::<16>::with_capacity(payload.len());
        aligned.extend_from_slice(payload);
        let message =
            rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(PacketError::Deserialize)?;

        if message.tag() != tag {
            return Err(PacketError::TagMismatch {
                tag,
                payload: message.tag(),
            });
        }
        Ok(message)
    }

    /// Decodes for the routing layer: undecodable payloads are logged and dropped.
    pub fn decode_or_drop(data: &[u8]) -> Option<Self> {
        match Self::decode(data) {
            Ok(message) => Some(message),
            Err(err) => {
                log::warn!("dropping undecodable payload of {} bytes: {err}", data.len());
                None
            }
        }
    }
}

impl From<&EntityState> for StateData {
    fn from(state: &EntityState) -> Self {
        Self {
            entity_id: state.entity_id,
            position: state.position.to_array(),
            look: state.look.to_array(),
            vertical_velocity: state.vertical_velocity,
        }
    }
}

impl From<&StateData> for EntityState {
    fn from(data: &StateData) -> Self {
        Self {
            entity_id: data.entity_id,
            position: Vec3::from_array(data.position),
            look: sanitize_look(Quat::from_array(data.look)),
            vertical_velocity: data.vertical_velocity,
        }
    }
}

impl From<&InputSample> for InputData {
    fn from(input: &InputSample) -> Self {
        Self {
            keys: input.keys.bits(),
            look: input.look.to_array(),
            fire_tick: input.fire_tick,
        }
    }
}

impl From<&InputData> for InputSample {
    fn from(data: &InputData) -> Self {
        InputSample {
            keys: KeyFlags::from_bits_truncate(data.keys),
            look: Quat::from_array(data.look),
            fire_tick: data.fire_tick,
        }
        .sanitized()
    }
}

impl From<&SpawnInfo> for SpawnData {
    fn from(spawn: &SpawnInfo) -> Self {
        Self {
            entity_id: spawn.entity_id,
            name: spawn.name.clone(),
            position: spawn.position.to_array(),
        }
    }
}

impl From<&SpawnData> for SpawnInfo {
    fn from(data: &SpawnData) -> Self {
        Self {
            entity_id: data.entity_id,
            name: data.name.clone(),
            position: Vec3::from_array(data.position),
        }
    }
}

impl From<&Snapshot> for SnapshotData {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            tick: snapshot.tick,
            spawns: snapshot.spawns.iter().map(SpawnData::from).collect(),
            despawns: snapshot.despawns.clone(),
            updates: snapshot.updates.iter().map(StateData::from).collect(),
            health_updates: snapshot
                .health_updates
                .iter()
                .map(|h| HealthData {
                    entity_id: h.entity_id,
                    health: h.health,
                })
                .collect(),
        }
    }
}

impl From<&SnapshotData> for Snapshot {
    fn from(data: &SnapshotData) -> Self {
        Self {
            tick: data.tick,
            spawns: data.spawns.iter().map(SpawnInfo::from).collect(),
            despawns: data.despawns.clone(),
            updates: data.updates.iter().map(EntityState::from).collect(),
            health_updates: data
                .health_updates
                .iter()
                .map(|h| HealthUpdate {
                    entity_id: h.entity_id,
                    health: h.health,
                })
                .collect(),
        }
    }
}
