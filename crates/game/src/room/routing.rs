use crate::net::{Message, Peer, Reliability, Transport};
use crate::physics::PhysicsBackend;
use crate::snapshot::{EntityId, InputSample};

use super::Room;

/// Dispatches one in-game message from `from` to `room`.
///
/// Network receipt only ever enqueues input or changes membership; simulation
/// state is touched exclusively by `Room::tick`.
pub fn route_room_message<P, T>(
    room: &mut Room<P>,
    from: EntityId,
    message: Message,
    transport: &mut T,
) where
    P: PhysicsBackend,
    T: Transport + ?Sized,
{
    match message {
        Message::GameJoin => match room.spawn(from) {
            Ok(_) => {
                let start = Message::GameStart(room.game_start());
                transport.send(Peer::Client(from), &start, Reliability::Reliable);
            }
            Err(err) => {
                log::warn!("entity {from} could not start in room {}: {err}", room.name());
            }
        },
        Message::PlayerInput(data) => room.receive_input(from, InputSample::from(&data)),
        Message::LeaveRoom => {
            room.leave(from);
        }
        other => log::debug!(
            "room {} ignoring {:?} from entity {from}",
            room.name(),
            other.tag()
        ),
    }
}
