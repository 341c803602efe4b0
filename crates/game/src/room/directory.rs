use std::collections::{BTreeMap, HashMap};

use crate::net::{Message, Peer, Reliability, RoomInfo, Transport};
use crate::snapshot::EntityId;

use super::RoomError;

#[derive(Debug)]
struct Listing {
    max_slots: u8,
    occupants: BTreeMap<EntityId, String>,
}

/// What the lobby decided; the caller forwards it to the room's simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyEvent {
    Joined {
        entity_id: EntityId,
        room: String,
        name: String,
    },
    Left {
        entity_id: EntityId,
        room: String,
    },
}

/// Lobby-side catalogue of named rooms and who sits in which.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: BTreeMap<String, Listing>,
    locations: HashMap<EntityId, String>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_room(&mut self, name: &str, max_slots: u8) -> Result<(), RoomError> {
        if self.rooms.contains_key(name) {
            return Err(RoomError::DuplicateRoom(name.to_owned()));
        }
        self.rooms.insert(
            name.to_owned(),
            Listing {
                max_slots,
                occupants: BTreeMap::new(),
            },
        );
        log::info!("room {name} opened with {max_slots} slots");
        Ok(())
    }

    /// Removes the room and returns the entities that were seated in it.
    pub fn remove_room(&mut self, name: &str) -> Result<Vec<EntityId>, RoomError> {
        let listing = self
            .rooms
            .remove(name)
            .ok_or_else(|| RoomError::UnknownRoom(name.to_owned()))?;
        let evicted: Vec<EntityId> = listing.occupants.into_keys().collect();
        for entity_id in &evicted {
            self.locations.remove(entity_id);
        }
        Ok(evicted)
    }

    pub fn room_list(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .map(|(name, listing)| RoomInfo {
                name: name.clone(),
                occupied: listing.occupants.len() as u8,
                max_slots: listing.max_slots,
            })
            .collect()
    }

    pub fn room_of(&self, entity_id: EntityId) -> Option<&str> {
        self.locations.get(&entity_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn join(&mut self, entity_id: EntityId, room: &str, name: &str) -> Result<(), RoomError> {
        if self.locations.contains_key(&entity_id) {
            return Err(RoomError::AlreadyJoined(entity_id));
        }
        let listing = self
            .rooms
            .get_mut(room)
            .ok_or_else(|| RoomError::UnknownRoom(room.to_owned()))?;
        if listing.occupants.len() >= listing.max_slots as usize {
            return Err(RoomError::Full(room.to_owned()));
        }

        listing.occupants.insert(entity_id, name.to_owned());
        self.locations.insert(entity_id, room.to_owned());
        Ok(())
    }

    /// Frees the seat held by `entity_id`, returning the room it was in.
    pub fn leave(&mut self, entity_id: EntityId) -> Option<String> {
        let room = self.locations.remove(&entity_id)?;
        if let Some(listing) = self.rooms.get_mut(&room) {
            listing.occupants.remove(&entity_id);
        }
        Some(room)
    }
}

/// Dispatches one lobby message from `from`, replying directly through
/// `transport`.
pub fn route_lobby_message<T: Transport + ?Sized>(
    directory: &mut RoomDirectory,
    from: EntityId,
    message: Message,
    transport: &mut T,
) -> Option<LobbyEvent> {
    let peer = Peer::Client(from);
    match message {
        Message::JoinRoom { room, name } => match directory.join(from, &room, &name) {
            Ok(()) => {
                log::info!("{name} (entity {from}) admitted to room {room}");
                transport.send(
                    peer,
                    &Message::JoinRoomAccepted { room: room.clone() },
                    Reliability::Reliable,
                );
                Some(LobbyEvent::Joined {
                    entity_id: from,
                    room,
                    name,
                })
            }
            Err(err) => {
                log::warn!("denied {name} (entity {from}) entry to {room}: {err}");
                transport.send(
                    peer,
                    &Message::JoinRoomDenied {
                        rooms: directory.room_list(),
                    },
                    Reliability::Reliable,
                );
                None
            }
        },
        Message::RoomList(_) => {
            transport.send(
                peer,
                &Message::RoomList(directory.room_list()),
                Reliability::Reliable,
            );
            None
        }
        Message::LeaveRoom => directory
            .leave(from)
            .map(|room| LobbyEvent::Left {
                entity_id: from,
                room,
            }),
        other => {
            log::debug!("lobby ignoring {:?} from entity {from}", other.tag());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::LoopbackTransport;

    fn directory() -> RoomDirectory {
        let mut directory = RoomDirectory::new();
        directory.create_room("arena", 2).unwrap();
        directory.create_room("yard", 4).unwrap();
        directory
    }

    #[test]
    fn room_list_reports_occupancy() {
        let mut directory = directory();
        directory.join(1, "arena", "alice").unwrap();

        let list = directory.room_list();

        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "arena");
        assert_eq!(list[0].occupied, 1);
        assert_eq!(list[0].max_slots, 2);
        assert_eq!(directory.room_of(1), Some("arena"));
    }

    #[test]
    fn joins_fail_for_full_unknown_or_duplicate() {
        let mut directory = directory();
        directory.join(1, "arena", "a").unwrap();
        directory.join(2, "arena", "b").unwrap();

        assert_eq!(directory.join(3, "arena", "c"), Err(RoomError::Full("arena".into())));
        assert_eq!(
            directory.join(3, "nowhere", "c"),
            Err(RoomError::UnknownRoom("nowhere".into()))
        );
        assert_eq!(directory.join(1, "yard", "a"), Err(RoomError::AlreadyJoined(1)));
        assert_eq!(
            directory.create_room("yard", 8),
            Err(RoomError::DuplicateRoom("yard".into()))
        );
    }

    #[test]
    fn leaving_frees_the_seat() {
        let mut directory = directory();
        directory.join(1, "arena", "a").unwrap();

        assert_eq!(directory.leave(1).as_deref(), Some("arena"));
        assert_eq!(directory.leave(1), None);
        assert_eq!(directory.room_list()[0].occupied, 0);
    }

    #[test]
    fn removing_a_room_evicts_its_occupants() {
        let mut directory = directory();
        directory.join(1, "yard", "a").unwrap();
        directory.join(2, "yard", "b").unwrap();

        assert_eq!(directory.remove_room("yard"), Ok(vec![1, 2]));
        assert_eq!(directory.room_of(1), None);
        assert_eq!(directory.len(), 1);
        assert!(directory.remove_room("yard").is_err());
    }

    #[test]
    fn join_request_is_accepted_or_denied_with_room_list() {
        let mut directory = directory();
        let mut transport = LoopbackTransport::new();

        let event = route_lobby_message(
            &mut directory,
            7,
            Message::JoinRoom {
                room: "yard".into(),
                name: "gus".into(),
            },
            &mut transport,
        );
        assert_eq!(
            event,
            Some(LobbyEvent::Joined {
                entity_id: 7,
                room: "yard".into(),
                name: "gus".into(),
            })
        );
        assert_eq!(
            transport.take_for(Peer::Client(7)),
            vec![Message::JoinRoomAccepted {
                room: "yard".into()
            }]
        );

        let event = route_lobby_message(
            &mut directory,
            8,
            Message::JoinRoom {
                room: "moon".into(),
                name: "hal".into(),
            },
            &mut transport,
        );
        assert_eq!(event, None);
        let replies = transport.take_for(Peer::Client(8));
        assert!(matches!(&replies[0], Message::JoinRoomDenied { rooms } if rooms.len() == 2));
    }

    #[test]
    fn leave_request_reports_the_room() {
        let mut directory = directory();
        let mut transport = LoopbackTransport::new();
        directory.join(1, "arena", "a").unwrap();

        let event = route_lobby_message(&mut directory, 1, Message::LeaveRoom, &mut transport);

        assert_eq!(
            event,
            Some(LobbyEvent::Left {
                entity_id: 1,
                room: "arena".into()
            })
        );
        assert!(transport.is_empty());
    }
}
