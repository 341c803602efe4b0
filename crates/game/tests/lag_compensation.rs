use glam::{Quat, Vec3};

use recoil::{
    Arena, EntityId, InputSample, KeyFlags, LoopbackTransport, PhysicsBackend, PhysicsWorld, Room,
    RoomConfig,
};

const ALICE: EntityId = 1;
const BOB: EntityId = 2;

/// Rapier-backed room that consumes exactly one input per member per tick.
fn lockstep_room() -> Room<PhysicsWorld> {
    let mut config = RoomConfig::named("range");
    config.input_buffer_target = 0;
    config.input_buffer_tolerance = 0;
    let physics = PhysicsWorld::with_arena(&config.movement, &Arena::flat());

    let mut room = Room::new(config, physics);
    room.join(ALICE, "alice").unwrap();
    room.join(BOB, "bob").unwrap();
    room
}

fn step(room: &mut Room<PhysicsWorld>, alice: InputSample, bob: InputSample) {
    let mut transport = LoopbackTransport::new();
    room.receive_input(ALICE, alice);
    room.receive_input(BOB, bob);
    room.tick(&mut transport).unwrap();
}

fn aim_at(room: &Room<PhysicsWorld>, from: EntityId, to: EntityId) -> Quat {
    let from = room.member_state(from).unwrap().position;
    let to = room.member_state(to).unwrap().position;
    let flat = Vec3::new(to.x - from.x, 0.0, to.z - from.z).normalize();
    Quat::from_rotation_arc(Vec3::Z, flat)
}

#[test]
fn test_characters_settle_on_the_ground() {
    let mut room = lockstep_room();

    for _ in 0..30 {
        step(&mut room, InputSample::idle(), InputSample::idle());
    }

    let alice = room.member_state(ALICE).unwrap();
    assert!(
        alice.position.y > 0.8 && alice.position.y <= 1.0,
        "alice floated to {}",
        alice.position.y
    );
    let settled = alice.position;
    step(&mut room, InputSample::idle(), InputSample::idle());
    assert!((room.member_state(ALICE).unwrap().position - settled).length() < 1e-3);
}

#[test]
fn test_rewound_shot_hits_target_that_moved_away() {
    let mut room = lockstep_room();
    let aim = InputSample::new(KeyFlags::empty(), aim_at(&room, ALICE, BOB));

    for _ in 0..5 {
        step(&mut room, aim, InputSample::idle());
    }
    let seen_at = room.server_tick();

    // Bob strafes out of the line of fire.
    for _ in 0..6 {
        step(&mut room, aim, InputSample::new(KeyFlags::RIGHT, Quat::IDENTITY));
    }

    let present_shot = InputSample::new(KeyFlags::FIRE, aim.look).with_fire_tick(room.server_tick());
    step(&mut room, present_shot, InputSample::idle());
    assert_eq!(room.stats().shots, 1);
    assert_eq!(room.stats().hits, 0);
    assert_eq!(room.health(BOB), Some(100));

    let rewound_shot = InputSample::new(KeyFlags::FIRE, aim.look).with_fire_tick(seen_at);
    step(&mut room, rewound_shot, InputSample::idle());
    assert_eq!(room.stats().shots, 2);
    assert_eq!(room.stats().hits, 1);
    assert_eq!(room.health(BOB), Some(95));
}

#[test]
fn test_targets_are_restored_after_rewind() {
    let mut room = lockstep_room();
    let aim = InputSample::new(KeyFlags::empty(), aim_at(&room, ALICE, BOB));

    for _ in 0..5 {
        step(&mut room, aim, InputSample::idle());
    }
    let seen_at = room.server_tick();
    for _ in 0..6 {
        step(&mut room, aim, InputSample::new(KeyFlags::RIGHT, Quat::IDENTITY));
    }

    let shot = InputSample::new(KeyFlags::FIRE, aim.look).with_fire_tick(seen_at);
    step(&mut room, shot, InputSample::idle());

    let bob = *room.member_state(BOB).unwrap();
    let body = room.physics().position(BOB).unwrap();
    assert!(
        (body - bob.position).length() < 1e-3,
        "bob's collider stayed at {body} instead of {}",
        bob.position
    );

    // Movement after the rewind is unaffected by where bob was shot.
    step(&mut room, aim, InputSample::new(KeyFlags::RIGHT, Quat::IDENTITY));
    let moved = room.member_state(BOB).unwrap().position.x - bob.position.x;
    assert!((moved - 0.1).abs() < 1e-2, "bob moved {moved}");
}
