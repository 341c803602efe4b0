use std::time::{Duration, Instant};

use glam::{Quat, Vec3};
use tokio::sync::{mpsc, watch};

use recoil::{
    ClientConfig, ClientSession, EntityId, KeyFlags, Message, PhysicsWorld, SessionStats,
    SimulatedLink,
};

use crate::config::ServerConfig;
use crate::pacing::Pacer;
use crate::switchboard::{Datagram, Inbound, Uplink};

const FIRE_EVERY: u64 = 25;
const STRAFE_PERIOD: u64 = 100;
const JUMP_EVERY: u64 = 120;
const ENGAGE_RANGE: f32 = 30.0;

/// Scripted keys and look for one fixed update. Bots face the nearest
/// opponent in range and strafe while firing; otherwise they wander in a
/// slow circle.
pub fn scripted_controls(
    index: usize,
    frame: u64,
    own: Vec3,
    nearest: Option<Vec3>,
) -> (KeyFlags, Quat) {
    let mut keys = KeyFlags::empty();
    if frame % JUMP_EVERY == JUMP_EVERY / 2 {
        keys |= KeyFlags::JUMP;
    }

    let target = nearest
        .map(|p| Vec3::new(p.x - own.x, 0.0, p.z - own.z))
        .filter(|offset| offset.length() <= ENGAGE_RANGE && offset.length_squared() > 1e-6);

    match target {
        Some(offset) => {
            keys |= if (frame / STRAFE_PERIOD) % 2 == 0 {
                KeyFlags::LEFT
            } else {
                KeyFlags::RIGHT
            };
            if frame % FIRE_EVERY == 0 {
                keys |= KeyFlags::FIRE;
            }
            (keys, Quat::from_rotation_arc(Vec3::Z, offset.normalize()))
        }
        None => {
            let yaw = index as f32 * 1.7 + frame as f32 * 0.015;
            (keys | KeyFlags::FORWARD, Quat::from_rotation_y(yaw))
        }
    }
}

/// In-process client playing over a simulated link.
pub struct Bot {
    index: usize,
    session: ClientSession<PhysicsWorld>,
    uplink: SimulatedLink<Datagram>,
    downlink: SimulatedLink<Datagram>,
    inbox: mpsc::UnboundedReceiver<Datagram>,
    lobby: mpsc::UnboundedSender<Inbound>,
    tick_rate: u32,
    preferred_room: String,
    frame: u64,
    retry_at: u64,
}

impl Bot {
    pub fn connect(
        index: usize,
        config: &ServerConfig,
        lobby: mpsc::UnboundedSender<Inbound>,
    ) -> Self {
        let entity_id = index as EntityId + 1;
        let (downlink_tx, inbox) = mpsc::unbounded_channel();
        let _ = lobby.send(Inbound::Connect {
            entity_id,
            downlink: downlink_tx,
        });

        let movement = config.movement();
        let physics = PhysicsWorld::with_arena(&movement, &config.arena.build());
        let session = ClientSession::new(
            entity_id,
            format!("bot-{entity_id}"),
            movement,
            ClientConfig::default(),
            physics,
        );
        let rooms = config.room_names();
        let seed = config.seed ^ (u64::from(entity_id) << 32);

        Self {
            index,
            session,
            uplink: SimulatedLink::new(config.link.clone(), seed),
            downlink: SimulatedLink::new(config.link.clone(), seed.rotate_left(17)),
            inbox,
            lobby,
            tick_rate: config.tick_rate.max(1),
            preferred_room: rooms[index % rooms.len()].clone(),
            frame: 0,
            retry_at: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.session.name()
    }

    /// Plays until `shutdown` flips, then leaves and reports its session counters.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> (String, SessionStats) {
        let mut pacer = Pacer::new(self.tick_rate);
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                due = pacer.wait() => {
                    for _ in 0..due {
                        self.step(Instant::now());
                    }
                }
            }
        }

        self.disconnect();
        log::debug!(
            "{} saw {} retransmits up and {} down",
            self.name(),
            self.uplink.retransmits(),
            self.downlink.retransmits()
        );
        (self.name().to_owned(), self.session.stats())
    }

    fn step(&mut self, now: Instant) {
        while let Ok(datagram) = self.inbox.try_recv() {
            let reliability = datagram.reliability;
            self.downlink.push(now, datagram, reliability);
        }
        for datagram in self.downlink.poll(now) {
            if let Some(message) = Message::decode_or_drop(&datagram.bytes) {
                self.session
                    .on_message(message, &mut Uplink::new(&mut self.uplink, now));
            }
        }

        if self.session.is_playing() {
            let (keys, look) = self.controls();
            self.session
                .fixed_update(keys, look, &mut Uplink::new(&mut self.uplink, now));
        } else {
            self.try_join(now);
        }
        self.frame += 1;

        self.flush(now);
    }

    fn controls(&self) -> (KeyFlags, Quat) {
        let own = self
            .session
            .predicted_state()
            .map(|state| state.position)
            .unwrap_or_default();
        let nearest = self
            .session
            .remotes()
            .values()
            .map(|remote| remote.state.position)
            .min_by(|a, b| a.distance_squared(own).total_cmp(&b.distance_squared(own)));
        scripted_controls(self.index, self.frame, own, nearest)
    }

    fn try_join(&mut self, now: Instant) {
        if self.session.room().is_some() || self.frame < self.retry_at {
            return;
        }
        let room = self
            .session
            .known_rooms()
            .iter()
            .find(|room| room.occupied < room.max_slots)
            .map(|room| room.name.clone())
            .unwrap_or_else(|| self.preferred_room.clone());

        self.session
            .request_join(&room, &mut Uplink::new(&mut self.uplink, now));
        self.retry_at = self.frame + 2 * u64::from(self.tick_rate);
    }

    fn flush(&mut self, now: Instant) {
        let from = self.session.entity_id();
        for datagram in self.uplink.poll(now) {
            let packet = Inbound::Packet {
                from,
                bytes: datagram.bytes,
            };
            if self.lobby.send(packet).is_err() {
                log::debug!("{} lost the lobby", self.session.name());
                return;
            }
        }
    }

    fn disconnect(&mut self) {
        let now = Instant::now();
        self.session.leave(&mut Uplink::new(&mut self.uplink, now));
        // Everything still in flight is delivered before the connection drops.
        self.flush(now + Duration::from_secs(60));
        let _ = self.lobby.send(Inbound::Disconnect {
            entity_id: self.session.entity_id(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wandering_bots_walk_forward() {
        let (keys, look) = scripted_controls(0, 1, Vec3::ZERO, None);

        assert!(keys.contains(KeyFlags::FORWARD));
        assert!(!keys.contains(KeyFlags::FIRE));
        assert!(look.is_normalized());
    }

    #[test]
    fn bots_face_and_shoot_nearby_opponents() {
        let own = Vec3::new(1.0, 0.9, 1.0);
        let enemy = Vec3::new(1.0, 0.9, 6.0);

        let (keys, look) = scripted_controls(3, FIRE_EVERY * 4, own, Some(enemy));

        assert!(keys.contains(KeyFlags::FIRE));
        assert!(!keys.contains(KeyFlags::FORWARD));
        assert!((look * Vec3::Z - Vec3::Z).length() < 1e-5);
    }

    #[test]
    fn distant_opponents_are_ignored() {
        let (keys, _) = scripted_controls(0, 0, Vec3::ZERO, Some(Vec3::new(0.0, 0.0, 500.0)));

        assert!(keys.contains(KeyFlags::FORWARD));
        assert!(!keys.contains(KeyFlags::FIRE));
    }

    #[test]
    fn strafing_alternates_direction() {
        let enemy = Some(Vec3::new(5.0, 0.0, 0.0));
        let (first, _) = scripted_controls(0, 1, Vec3::ZERO, enemy);
        let (second, _) = scripted_controls(0, STRAFE_PERIOD + 1, Vec3::ZERO, enemy);

        assert!(first.contains(KeyFlags::LEFT));
        assert!(second.contains(KeyFlags::RIGHT));
    }

    #[test]
    fn bots_announce_themselves_to_the_lobby() {
        let (lobby_tx, mut lobby_rx) = mpsc::unbounded_channel();
        let config = ServerConfig {
            rooms: vec!["a".into(), "b".into()],
            ..Default::default()
        };

        let bot = Bot::connect(1, &config, lobby_tx);

        assert_eq!(bot.name(), "bot-2");
        assert_eq!(bot.preferred_room, "b");
        assert!(matches!(
            lobby_rx.try_recv().unwrap(),
            Inbound::Connect { entity_id: 2, .. }
        ));
    }
}
