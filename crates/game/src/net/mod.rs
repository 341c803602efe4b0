mod link;
mod protocol;
mod transport;

pub use link::{LinkConditions, SimulatedLink};
pub use protocol::{
    GameStartData, HealthData, InputData, Message, PacketError, RoomInfo, SnapshotData, SpawnData,
    StateData, Tag,
};
pub use transport::{Envelope, LoopbackTransport, Peer, Reliability, Transport};
