use super::entity::{EntityId, EntityState, HealthUpdate, SpawnInfo, Tick};

/// Everything a client needs to advance its view of the room by one server tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tick: Tick,
    pub spawns: Vec<SpawnInfo>,
    pub despawns: Vec<EntityId>,
    pub updates: Vec<EntityState>,
    pub health_updates: Vec<HealthUpdate>,
}

impl Snapshot {
    pub fn update_for(&self, entity_id: EntityId) -> Option<&EntityState> {
        self.updates.iter().find(|s| s.entity_id == entity_id)
    }

    pub fn health_for(&self, entity_id: EntityId) -> Option<u8> {
        self.health_updates
            .iter()
            .rev()
            .find(|h| h.entity_id == entity_id)
            .map(|h| h.health)
    }
}

/// Spawns, despawns and health changes accumulated between two snapshots.
#[derive(Debug, Default)]
pub struct TickEvents {
    spawns: Vec<SpawnInfo>,
    despawns: Vec<EntityId>,
    health_updates: Vec<HealthUpdate>,
}

impl TickEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawn(&mut self, spawn: SpawnInfo) {
        self.spawns.push(spawn);
    }

    pub fn record_despawn(&mut self, entity_id: EntityId) {
        self.despawns.push(entity_id);
    }

    pub fn record_health(&mut self, entity_id: EntityId, health: u8) {
        self.health_updates.push(HealthUpdate { entity_id, health });
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.despawns.is_empty() && self.health_updates.is_empty()
    }

    pub fn clear(&mut self) {
        self.spawns.clear();
        self.despawns.clear();
        self.health_updates.clear();
    }

    /// Builds the snapshot for `tick` and leaves the accumulator empty.
    pub fn take_snapshot(&mut self, tick: Tick, updates: Vec<EntityState>) -> Snapshot {
        Snapshot {
            tick,
            spawns: std::mem::take(&mut self.spawns),
            despawns: std::mem::take(&mut self.despawns),
            updates,
            health_updates: std::mem::take(&mut self.health_updates),
        }
    }
}
