use bitflags::bitflags;
use glam::Quat;

use super::entity::Tick;

bitflags! {
    /// Keys held during one input sample.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyFlags: u8 {
        const FORWARD = 1 << 0;
        const LEFT = 1 << 1;
        const BACK = 1 << 2;
        const RIGHT = 1 << 3;
        const JUMP = 1 << 4;
        const FIRE = 1 << 5;
    }
}

impl KeyFlags {
    /// Index order of the boolean key array used by older clients.
    const ORDER: [KeyFlags; 6] = [
        KeyFlags::FORWARD,
        KeyFlags::LEFT,
        KeyFlags::BACK,
        KeyFlags::RIGHT,
        KeyFlags::JUMP,
        KeyFlags::FIRE,
    ];

    /// Missing trailing entries count as released; extra entries are ignored.
    pub fn from_array(keys: &[bool]) -> Self {
        Self::ORDER
            .iter()
            .zip(keys)
            .filter(|(_, pressed)| **pressed)
            .fold(KeyFlags::empty(), |acc, (flag, _)| acc | *flag)
    }

    pub fn to_array(self) -> [bool; 6] {
        Self::ORDER.map(|flag| self.contains(flag))
    }
}

/// One fixed-update worth of player input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSample {
    pub keys: KeyFlags,
    pub look: Quat,
    /// Server tick the shooter was seeing when firing. Only set together with `FIRE`.
    pub fire_tick: Option<Tick>,
}

impl Default for InputSample {
    fn default() -> Self {
        Self::idle()
    }
}

impl InputSample {
    pub fn new(keys: KeyFlags, look: Quat) -> Self {
        Self {
            keys,
            look,
            fire_tick: None,
        }
    }

    pub fn idle() -> Self {
        Self::new(KeyFlags::empty(), Quat::IDENTITY)
    }

    pub fn with_fire_tick(mut self, tick: Tick) -> Self {
        self.fire_tick = Some(tick);
        self
    }

    /// Replaces a non-finite or degenerate look rotation with identity and
    /// normalizes the rest, so every peer steers with the same rotation.
    pub fn sanitized(mut self) -> Self {
        self.look = sanitize_look(self.look);
        if !self.fires() {
            self.fire_tick = None;
        }
        self
    }

    pub fn fires(&self) -> bool {
        self.keys.contains(KeyFlags::FIRE)
    }

    /// Collapses the samples consumed in one tick into a single step input:
    /// keys are OR'd, look comes from the last sample.
    pub fn merge(samples: &[InputSample]) -> Option<InputSample> {
        let (first, rest) = samples.split_first()?;
        let merged = rest.iter().fold(*first, |mut merged, next| {
            merged.keys |= next.keys;
            merged.look = next.look;
            if next.fire_tick.is_some() {
                merged.fire_tick = next.fire_tick;
            }
            merged
        });
        Some(merged)
    }
}

pub fn sanitize_look(look: Quat) -> Quat {
    if !look.is_finite() || look.length_squared() <= f32::EPSILON {
        Quat::IDENTITY
    } else {
        look.normalize()
    }
}
