use tokio::sync::mpsc;

use recoil::{Message, PhysicsBackend, Room, RoomStats, route_room_message};

use crate::lobby::RoomCommand;
use crate::pacing::Pacer;
use crate::switchboard::Switchboard;

/// Drives one room at its fixed tick rate until the lobby drops its inbox,
/// then closes the room and returns its counters.
pub async fn run_room<P: PhysicsBackend>(
    mut room: Room<P>,
    mut inbox: mpsc::UnboundedReceiver<RoomCommand>,
) -> RoomStats {
    let mut transport = Switchboard::new();
    let mut pacer = Pacer::new(room.config().movement.tick_rate);
    log::info!(
        "room {} open with {} slots",
        room.name(),
        room.config().max_slots
    );

    loop {
        tokio::select! {
            command = inbox.recv() => match command {
                Some(command) => apply_command(&mut room, &mut transport, command),
                None => break,
            },
            due = pacer.wait() => {
                for _ in 0..due {
                    room.tick(&mut transport);
                }
            }
        }
    }

    room.close(&mut transport);
    let stats = room.stats();
    log::info!(
        "room {} closed after {} ticks ({} hits from {} shots, {} messages sent)",
        room.name(),
        stats.ticks,
        stats.hits,
        stats.shots,
        transport.sent()
    );
    stats
}

/// Applies one lobby command. Only membership changes and input enqueues
/// happen here; simulation stays inside `Room::tick`.
pub fn apply_command<P: PhysicsBackend>(
    room: &mut Room<P>,
    transport: &mut Switchboard,
    command: RoomCommand,
) {
    match command {
        RoomCommand::Seat {
            entity_id,
            name,
            downlink,
        } => match room.seat(entity_id, &name) {
            Ok(()) => transport.connect(entity_id, downlink),
            Err(err) => log::warn!("room {} refused {name}: {err}", room.name()),
        },
        RoomCommand::Deliver { from, message } => {
            let leaving = message == Message::LeaveRoom;
            route_room_message(room, from, message, transport);
            if leaving {
                transport.disconnect(from);
            }
        }
        RoomCommand::Leave { entity_id } => {
            room.leave(entity_id);
            transport.disconnect(entity_id);
        }
    }
}
