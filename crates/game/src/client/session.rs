use std::collections::BTreeMap;

use glam::Quat;

use crate::movement::{MovementConfig, StateTransition};
use crate::net::{GameStartData, InputData, Message, Peer, Reliability, RoomInfo, Transport};
use crate::physics::PhysicsBackend;
use crate::simulation::JitterBuffer;
use crate::snapshot::{EntityId, EntityState, InputSample, KeyFlags, Snapshot, SpawnInfo, Tick};

use super::{ClientConfig, ClientPredictor, Reconciliation};

const FULL_HEALTH: u8 = 100;

/// Latest known view of an entity this client does not control.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteEntity {
    pub name: String,
    pub state: EntityState,
    pub health: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub snapshots_applied: u64,
    pub inputs_sent: u64,
    pub confirmed: u64,
    pub corrected: u64,
}

/// Client side of one player: joins a room, predicts its own entity every
/// fixed update and folds server snapshots back in.
pub struct ClientSession<P> {
    entity_id: EntityId,
    name: String,
    config: ClientConfig,
    transition: StateTransition,
    physics: P,
    snapshots: JitterBuffer<Snapshot>,
    predictor: Option<ClientPredictor>,
    client_tick: Tick,
    last_received_server_tick: Tick,
    remotes: BTreeMap<EntityId, RemoteEntity>,
    health: u8,
    room: Option<String>,
    known_rooms: Vec<RoomInfo>,
    stats: SessionStats,
}

impl<P: PhysicsBackend> ClientSession<P> {
    pub fn new(
        entity_id: EntityId,
        name: impl Into<String>,
        movement: MovementConfig,
        config: ClientConfig,
        physics: P,
    ) -> Self {
        let snapshots =
            JitterBuffer::new(config.snapshot_buffer_target, config.snapshot_buffer_tolerance);
        Self {
            entity_id,
            name: name.into(),
            config,
            transition: StateTransition::new(movement),
            physics,
            snapshots,
            predictor: None,
            client_tick: 0,
            last_received_server_tick: 0,
            remotes: BTreeMap::new(),
            health: FULL_HEALTH,
            room: None,
            known_rooms: Vec::new(),
            stats: SessionStats::default(),
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn known_rooms(&self) -> &[RoomInfo] {
        &self.known_rooms
    }

    pub fn is_playing(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn client_tick(&self) -> Tick {
        self.client_tick
    }

    pub fn last_received_server_tick(&self) -> Tick {
        self.last_received_server_tick
    }

    pub fn predicted_state(&self) -> Option<&EntityState> {
        self.predictor.as_ref().map(ClientPredictor::state)
    }

    pub fn predictor(&self) -> Option<&ClientPredictor> {
        self.predictor.as_ref()
    }

    pub fn health(&self) -> u8 {
        self.health
    }

    pub fn remotes(&self) -> &BTreeMap<EntityId, RemoteEntity> {
        &self.remotes
    }

    pub fn remote(&self, entity_id: EntityId) -> Option<&RemoteEntity> {
        self.remotes.get(&entity_id)
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn buffered_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    pub fn request_join<T: Transport + ?Sized>(&mut self, room: &str, transport: &mut T) {
        transport.send(
            Peer::Server,
            &Message::JoinRoom {
                room: room.to_owned(),
                name: self.name.clone(),
            },
            Reliability::Reliable,
        );
    }

    pub fn leave<T: Transport + ?Sized>(&mut self, transport: &mut T) {
        if self.room.is_some() {
            transport.send(Peer::Server, &Message::LeaveRoom, Reliability::Reliable);
        }
        self.reset();
    }

    /// Routes one message received from the server.
    pub fn on_message<T: Transport + ?Sized>(&mut self, message: Message, transport: &mut T) {
        match message {
            Message::JoinRoomAccepted { room } => {
                log::info!("{} joined room {room}", self.name);
                self.room = Some(room);
                transport.send(Peer::Server, &Message::GameJoin, Reliability::Reliable);
            }
            Message::JoinRoomDenied { rooms } => {
                log::warn!("{} was denied a room; {} rooms listed", self.name, rooms.len());
                self.known_rooms = rooms;
            }
            Message::RoomList(rooms) => self.known_rooms = rooms,
            Message::GameStart(data) => self.start(&data),
            Message::GameUpdate(data) => self.snapshots.add(Snapshot::from(&data)),
            other => log::debug!("client ignoring server-bound {:?}", other.tag()),
        }
    }

    /// One client fixed update: consumes buffered snapshots, predicts the
    /// local input and sends it to the server.
    pub fn fixed_update<T: Transport + ?Sized>(
        &mut self,
        keys: KeyFlags,
        look: Quat,
        transport: &mut T,
    ) -> Option<EntityState> {
        self.predictor.as_ref()?;
        self.client_tick = self.client_tick.wrapping_add(1);

        for snapshot in self.snapshots.drain() {
            self.apply_snapshot(&snapshot);
        }
        self.physics.refresh_queries();

        let mut input = InputSample::new(keys, look);
        if input.fires() {
            input = input.with_fire_tick(self.last_received_server_tick.saturating_sub(1));
        }
        let input = input.sanitized();

        let predictor = self.predictor.as_mut()?;
        let state = predictor.apply_input(self.client_tick, input, &mut self.physics);

        transport.send(
            Peer::Server,
            &Message::PlayerInput(InputData::from(&input)),
            Reliability::Reliable,
        );
        self.stats.inputs_sent += 1;
        Some(state)
    }

    fn start(&mut self, data: &GameStartData) {
        self.reset_world();
        self.client_tick = data.server_tick;
        self.last_received_server_tick = data.server_tick;

        for player in &data.players {
            self.spawn(&SpawnInfo::from(player));
        }
        if self.predictor.is_none() {
            log::warn!(
                "game start for {} did not list its own entity {}",
                self.name,
                self.entity_id
            );
        }
    }

    fn spawn(&mut self, spawn: &SpawnInfo) {
        let state = EntityState::spawned(spawn.entity_id, spawn.position);
        self.physics.insert_character(spawn.entity_id, spawn.position);

        if spawn.entity_id == self.entity_id {
            match self.predictor.as_mut() {
                Some(predictor) => predictor.reset(state),
                None => {
                    self.predictor = Some(ClientPredictor::new(
                        self.transition.clone(),
                        state,
                        &self.config,
                    ));
                }
            }
            self.health = FULL_HEALTH;
        } else {
            self.remotes.insert(
                spawn.entity_id,
                RemoteEntity {
                    name: spawn.name.clone(),
                    state,
                    health: FULL_HEALTH,
                },
            );
        }
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        self.last_received_server_tick = snapshot.tick;
        self.stats.snapshots_applied += 1;

        for spawn in &snapshot.spawns {
            if spawn.entity_id != self.entity_id {
                self.spawn(spawn);
            }
        }

        for &entity_id in &snapshot.despawns {
            if entity_id == self.entity_id {
                log::info!("{} was removed from the room", self.name);
                self.reset();
                return;
            }
            self.remotes.remove(&entity_id);
            self.physics.remove_character(entity_id);
        }

        let mut own_update = None;
        for update in &snapshot.updates {
            if update.entity_id == self.entity_id {
                own_update = Some(update);
            } else if let Some(remote) = self.remotes.get_mut(&update.entity_id) {
                remote.state = *update;
                self.physics.place(update.entity_id, update.position);
            }
        }

        // Replays must collide with the remotes where the server had them.
        self.physics.refresh_queries();
        if let (Some(update), Some(predictor)) = (own_update, self.predictor.as_mut()) {
            match predictor.reconcile(snapshot.tick, update, &mut self.physics) {
                Reconciliation::Confirmed => self.stats.confirmed += 1,
                Reconciliation::Corrected { .. } => self.stats.corrected += 1,
                Reconciliation::Stale => {}
            }
        }

        for health in &snapshot.health_updates {
            if health.entity_id == self.entity_id {
                self.health = health.health;
            } else if let Some(remote) = self.remotes.get_mut(&health.entity_id) {
                remote.health = health.health;
            }
        }
    }

    fn reset_world(&mut self) {
        for entity_id in self.remotes.keys() {
            self.physics.remove_character(*entity_id);
        }
        self.remotes.clear();
        self.physics.remove_character(self.entity_id);
        self.predictor = None;
        self.snapshots.clear();
    }

    fn reset(&mut self) {
        self.reset_world();
        self.room = None;
        self.health = FULL_HEALTH;
    }
}
