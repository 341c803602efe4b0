mod config;
mod directory;
mod lag;
mod routing;

use std::collections::BTreeMap;

use glam::Vec3;

use crate::movement::StateTransition;
use crate::net::{
    GameStartData, Message, Peer, Reliability, RoomInfo, SnapshotData, SpawnData, Transport,
};
use crate::physics::PhysicsBackend;
use crate::simulation::{EntitySimulationHistory, JitterBuffer};
use crate::snapshot::{
    EntityId, EntityState, InputSample, Snapshot, SpawnInfo, Tick, TickEvents,
};

pub use config::{HitScanConfig, RoomConfig};
pub use directory::{LobbyEvent, RoomDirectory, route_lobby_message};
pub use lag::{LagCompensator, RewindTarget, ShotReport};
pub use routing::route_room_message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomState {
    Idle,
    Running,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} is full")]
    Full(String),
    #[error("room {0} is closed")]
    Closed(String),
    #[error("entity {0} already holds a seat")]
    AlreadyJoined(EntityId),
    #[error("entity {0} has no seat in this room")]
    NotSeated(EntityId),
    #[error("no room named {0}")]
    UnknownRoom(String),
    #[error("a room named {0} already exists")]
    DuplicateRoom(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomStats {
    pub ticks: u64,
    pub inputs_received: u64,
    pub starved_steps: u64,
    pub shots: u64,
    pub hits: u64,
    pub respawns: u64,
}

#[derive(Debug)]
struct Member {
    name: String,
    slot: usize,
    state: EntityState,
    history: EntitySimulationHistory,
    inputs: JitterBuffer<InputSample>,
    health: u8,
}

/// One authoritative simulation: a bounded set of entities stepped together
/// at a fixed rate.
///
/// Seats are reserved when a player is admitted to the room; the entity is
/// only simulated once it spawns.
pub struct Room<P> {
    config: RoomConfig,
    state: RoomState,
    server_tick: Tick,
    seats: BTreeMap<EntityId, String>,
    members: BTreeMap<EntityId, Member>,
    physics: P,
    transition: StateTransition,
    lag: LagCompensator,
    events: TickEvents,
    stats: RoomStats,
}

impl<P: PhysicsBackend> Room<P> {
    pub fn new(config: RoomConfig, physics: P) -> Self {
        let lag = LagCompensator::new(&config.hit_scan, &config.movement, config.history_capacity);
        let transition = StateTransition::new(config.movement.clone());
        Self {
            config,
            state: RoomState::Idle,
            server_tick: 0,
            seats: BTreeMap::new(),
            members: BTreeMap::new(),
            physics,
            transition,
            lag,
            events: TickEvents::new(),
            stats: RoomStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    pub fn state(&self) -> RoomState {
        self.state
    }

    pub fn server_tick(&self) -> Tick {
        self.server_tick
    }

    pub fn stats(&self) -> RoomStats {
        self.stats
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_full(&self) -> bool {
        self.seats.len() >= self.config.max_slots as usize
    }

    pub fn is_member(&self, entity_id: EntityId) -> bool {
        self.members.contains_key(&entity_id)
    }

    pub fn members(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.keys().copied()
    }

    pub fn member_state(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.members.get(&entity_id).map(|m| &m.state)
    }

    pub fn health(&self, entity_id: EntityId) -> Option<u8> {
        self.members.get(&entity_id).map(|m| m.health)
    }

    pub fn history(&self, entity_id: EntityId) -> Option<&EntitySimulationHistory> {
        self.members.get(&entity_id).map(|m| &m.history)
    }

    pub fn buffered_inputs(&self, entity_id: EntityId) -> usize {
        self.members.get(&entity_id).map_or(0, |m| m.inputs.len())
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo {
            name: self.config.name.clone(),
            occupied: self.seats.len() as u8,
            max_slots: self.config.max_slots,
        }
    }

    /// Reserves a slot for `entity_id` without spawning it.
    pub fn seat(&mut self, entity_id: EntityId, name: &str) -> Result<(), RoomError> {
        if self.state == RoomState::Closed {
            return Err(RoomError::Closed(self.config.name.clone()));
        }
        if self.seats.contains_key(&entity_id) {
            return Err(RoomError::AlreadyJoined(entity_id));
        }
        if self.is_full() {
            return Err(RoomError::Full(self.config.name.clone()));
        }
        self.seats.insert(entity_id, name.to_owned());
        Ok(())
    }

    /// Spawns a seated entity into the simulation. Its spawn reaches the
    /// other members with the next snapshot.
    pub fn spawn(&mut self, entity_id: EntityId) -> Result<EntityState, RoomError> {
        if self.state == RoomState::Closed {
            return Err(RoomError::Closed(self.config.name.clone()));
        }
        let Some(name) = self.seats.get(&entity_id).cloned() else {
            return Err(RoomError::NotSeated(entity_id));
        };
        if let Some(member) = self.members.get(&entity_id) {
            return Ok(member.state);
        }

        let slot = self.free_slot();
        let position = self.spawn_position(slot);
        let state = EntityState::spawned(entity_id, position);
        let mut history = EntitySimulationHistory::new(self.config.history_capacity);
        history.push(state);

        self.physics.insert_character(entity_id, position);
        self.events.record_spawn(SpawnInfo {
            entity_id,
            name: name.clone(),
            position,
        });
        log::info!(
            "{name} (entity {entity_id}) spawned in room {} at tick {}",
            self.config.name,
            self.server_tick
        );

        self.members.insert(
            entity_id,
            Member {
                name,
                slot,
                state,
                history,
                inputs: JitterBuffer::new(
                    self.config.input_buffer_target,
                    self.config.input_buffer_tolerance,
                ),
                health: self.config.hit_scan.max_health,
            },
        );
        if self.state == RoomState::Idle {
            self.state = RoomState::Running;
        }
        Ok(state)
    }

    /// Seats and spawns in one step.
    pub fn join(&mut self, entity_id: EntityId, name: &str) -> Result<EntityState, RoomError> {
        self.seat(entity_id, name)?;
        self.spawn(entity_id)
    }

    pub fn leave(&mut self, entity_id: EntityId) -> bool {
        let seated = self.seats.remove(&entity_id).is_some();
        let Some(member) = self.members.remove(&entity_id) else {
            return seated;
        };

        self.physics.remove_character(entity_id);
        self.events.record_despawn(entity_id);
        log::info!(
            "{} (entity {entity_id}) left room {}",
            member.name,
            self.config.name
        );
        true
    }

    pub fn game_start(&self) -> GameStartData {
        GameStartData {
            server_tick: self.server_tick,
            players: self
                .members
                .iter()
                .map(|(id, member)| SpawnData {
                    entity_id: *id,
                    name: member.name.clone(),
                    position: member.state.position.to_array(),
                })
                .collect(),
        }
    }

    pub fn receive_input(&mut self, entity_id: EntityId, input: InputSample) {
        let Some(member) = self.members.get_mut(&entity_id) else {
            log::debug!("dropping input for unknown entity {entity_id}");
            return;
        };
        member.inputs.add(input);
        self.stats.inputs_received += 1;
    }

    /// Advances the room by one fixed tick and broadcasts the resulting snapshot.
    pub fn tick<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<Snapshot> {
        if self.state != RoomState::Running {
            return None;
        }
        self.server_tick = self.server_tick.wrapping_add(1);
        self.stats.ticks += 1;

        // Shots resolve against last tick's world before anyone moves.
        let ids: Vec<EntityId> = self.members.keys().copied().collect();
        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(member) = self.members.get_mut(&id) else {
                continue;
            };
            let samples = member.inputs.drain();
            if let Some(shot) = samples.iter().find(|s| s.fires()).copied() {
                self.fire(id, &shot);
            }
            drained.push((id, samples));
        }
        self.physics.refresh_queries();

        for (id, samples) in drained {
            let Some(member) = self.members.get_mut(&id) else {
                continue;
            };
            match InputSample::merge(&samples) {
                Some(input) => {
                    member.state = self
                        .transition
                        .apply(&input, &member.state, &mut self.physics);
                }
                None => self.stats.starved_steps += 1,
            }
            member.history.push(member.state);
        }

        let updates = self.members.values().map(|m| m.state).collect();
        let snapshot = self.events.take_snapshot(self.server_tick, updates);
        self.broadcast(&snapshot, transport);
        Some(snapshot)
    }

    /// Subtracts `amount` health, respawning the entity when it runs out.
    pub fn apply_damage(&mut self, entity_id: EntityId, amount: u8) {
        let max_health = self.config.hit_scan.max_health;
        let Some(member) = self.members.get(&entity_id) else {
            return;
        };
        let health = member.health.saturating_sub(amount);
        let slot = member.slot;

        if health == 0 {
            let position = self.spawn_position(slot);
            let Some(member) = self.members.get_mut(&entity_id) else {
                return;
            };
            member.health = max_health;
            member.state = EntityState::spawned(entity_id, position);
            self.physics.place(entity_id, position);
            self.stats.respawns += 1;
            log::info!("{} died and respawned in room {}", member.name, self.config.name);
        } else if let Some(member) = self.members.get_mut(&entity_id) {
            member.health = health;
        }

        if let Some(member) = self.members.get(&entity_id) {
            self.events.record_health(entity_id, member.health);
        }
    }

    /// Despawns every member, drops buffered input and stops ticking. The
    /// final despawn snapshot takes the next tick number and is sent to the
    /// departing members.
    pub fn close<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<Snapshot> {
        if self.state == RoomState::Closed {
            return None;
        }
        self.server_tick = self.server_tick.wrapping_add(1);

        for id in self.members.keys() {
            self.physics.remove_character(*id);
            self.events.record_despawn(*id);
        }
        let snapshot = self.events.take_snapshot(self.server_tick, Vec::new());
        self.broadcast(&snapshot, transport);

        self.members.clear();
        self.seats.clear();
        self.state = RoomState::Closed;
        log::info!("room {} closed at tick {}", self.config.name, self.server_tick);
        Some(snapshot)
    }

    fn fire(&mut self, shooter_id: EntityId, shot: &InputSample) {
        let reported_tick = shot
            .fire_tick
            .unwrap_or_else(|| self.server_tick.saturating_sub(1));

        let report = {
            let Some(shooter) = self.members.get(&shooter_id) else {
                return;
            };
            let shooter = RewindTarget {
                entity_id: shooter_id,
                current: &shooter.state,
                history: &shooter.history,
            };
            let others: Vec<_> = self
                .members
                .iter()
                .filter(|(id, _)| **id != shooter_id)
                .map(|(id, member)| RewindTarget {
                    entity_id: *id,
                    current: &member.state,
                    history: &member.history,
                })
                .collect();

            self.lag.resolve(
                &mut self.physics,
                self.server_tick,
                reported_tick,
                &shooter,
                &others,
            )
        };
        self.stats.shots += 1;

        let Some(target) = report.hit_entity() else {
            return;
        };
        if !self.members.contains_key(&target) {
            return;
        }
        log::debug!(
            "entity {shooter_id} hit {target} rewinding {} ticks",
            report.ticks_ago
        );
        self.stats.hits += 1;
        self.apply_damage(target, self.config.hit_scan.damage);
    }

    fn broadcast<T: Transport + ?Sized>(&self, snapshot: &Snapshot, transport: &mut T) {
        if self.members.is_empty() {
            return;
        }
        let message = Message::GameUpdate(SnapshotData::from(snapshot));
        for id in self.members.keys() {
            transport.send(Peer::Client(*id), &message, Reliability::Reliable);
        }
    }

    fn free_slot(&self) -> usize {
        (0..)
            .find(|slot| self.members.values().all(|m| m.slot != *slot))
            .unwrap_or_default()
    }

    /// Spawn positions spiral outwards from the spawn point so that
    /// simultaneous joins do not overlap.
    fn spawn_position(&self, slot: usize) -> Vec3 {
        if slot == 0 {
            return self.config.spawn_point;
        }
        let angle = slot as f32 * 2.399_963;
        let radius = self.config.spawn_spacing * (slot as f32).sqrt();
        self.config.spawn_point + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius)
    }
}
