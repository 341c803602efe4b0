pub mod client;
pub mod movement;
pub mod net;
pub mod physics;
pub mod room;
pub mod simulation;
pub mod snapshot;

pub use client::{
    ClientConfig, ClientPredictor, ClientSession, PredictionRecord, Reconciliation, RemoteEntity,
    SessionStats,
};
pub use movement::{MovementConfig, StateTransition};
pub use net::{
    Envelope, GameStartData, HealthData, InputData, LinkConditions, LoopbackTransport, Message,
    PacketError, Peer, Reliability, RoomInfo, SimulatedLink, SnapshotData, SpawnData, StateData,
    Tag, Transport,
};
pub use physics::{Arena, ArenaObject, FlatWorld, PhysicsBackend, PhysicsWorld, RayHit};
pub use room::{
    HitScanConfig, LagCompensator, LobbyEvent, RewindTarget, Room, RoomConfig, RoomDirectory,
    RoomError, RoomState, RoomStats, ShotReport, route_lobby_message, route_room_message,
};
pub use simulation::{
    Correction, DEFAULT_HISTORY_CAPACITY, EntitySimulationHistory, FixedTimestep, JitterBuffer,
};
pub use snapshot::{
    EntityId, EntityState, HealthUpdate, InputSample, KeyFlags, Snapshot, SpawnInfo, Tick,
    TickEvents, sanitize_look,
};
