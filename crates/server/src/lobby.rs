use std::collections::HashMap;

use tokio::sync::mpsc;

use recoil::{EntityId, LobbyEvent, Message, RoomDirectory, RoomError, route_lobby_message};

use crate::events::ServerEvent;
use crate::switchboard::{Downlink, Inbound, Switchboard};

/// Work handed from the lobby to a room task.
#[derive(Debug)]
pub enum RoomCommand {
    Seat {
        entity_id: EntityId,
        name: String,
        downlink: Downlink,
    },
    Deliver {
        from: EntityId,
        message: Message,
    },
    Leave {
        entity_id: EntityId,
    },
}

/// Owns the room directory and forwards in-game traffic to room tasks.
pub struct Lobby {
    directory: RoomDirectory,
    rooms: HashMap<String, mpsc::UnboundedSender<RoomCommand>>,
    clients: Switchboard,
    events: mpsc::UnboundedSender<ServerEvent>,
}

impl Lobby {
    pub fn new(events: mpsc::UnboundedSender<ServerEvent>) -> Self {
        Self {
            directory: RoomDirectory::new(),
            rooms: HashMap::new(),
            clients: Switchboard::new(),
            events,
        }
    }

    pub fn add_room(
        &mut self,
        name: &str,
        max_slots: u8,
        room: mpsc::UnboundedSender<RoomCommand>,
    ) -> Result<(), RoomError> {
        self.directory.create_room(name, max_slots)?;
        self.rooms.insert(name.to_owned(), room);
        Ok(())
    }

    /// Runs until every inbound sender is dropped. Dropping the lobby then
    /// closes the room inboxes.
    pub async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(inbound) = inbox.recv().await {
            self.handle(inbound);
        }
        log::info!(
            "lobby closed with {} rooms and {} clients",
            self.rooms.len(),
            self.clients.len()
        );
    }

    pub fn handle(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Connect {
                entity_id,
                downlink,
            } => {
                self.clients.connect(entity_id, downlink);
                self.emit(ServerEvent::ClientConnected { entity_id });
            }
            Inbound::Packet { from, bytes } => {
                if let Some(message) = Message::decode_or_drop(&bytes) {
                    self.route(from, message);
                }
            }
            Inbound::Disconnect { entity_id } => {
                if let Some(room) = self.directory.leave(entity_id) {
                    self.forward(&room, RoomCommand::Leave { entity_id });
                    self.emit(ServerEvent::PlayerLeft { entity_id, room });
                }
                self.clients.disconnect(entity_id);
                self.emit(ServerEvent::ClientDisconnected { entity_id });
            }
        }
    }

    fn route(&mut self, from: EntityId, message: Message) {
        let tag = message.tag();
        let current_room = self.directory.room_of(from).map(str::to_owned);

        if tag.is_lobby() || message == Message::LeaveRoom {
            let requested = match &message {
                Message::JoinRoom { room, .. } => Some(room.clone()),
                _ => None,
            };
            match route_lobby_message(&mut self.directory, from, message.clone(), &mut self.clients)
            {
                Some(LobbyEvent::Joined {
                    entity_id,
                    room,
                    name,
                }) => self.seat(entity_id, room, name),
                Some(LobbyEvent::Left { entity_id, room }) => {
                    self.emit(ServerEvent::PlayerLeft { entity_id, room });
                }
                None => {
                    if let Some(room) = requested {
                        self.emit(ServerEvent::JoinDenied {
                            entity_id: from,
                            room,
                        });
                    }
                }
            }
        }

        if !tag.is_lobby() {
            match current_room {
                Some(room) => self.forward(&room, RoomCommand::Deliver { from, message }),
                None => log::debug!("entity {from} sent {tag:?} outside any room"),
            }
        }
    }

    fn seat(&mut self, entity_id: EntityId, room: String, name: String) {
        let Some(downlink) = self.clients.downlink(entity_id) else {
            log::warn!("entity {entity_id} joined {room} without a connection");
            self.directory.leave(entity_id);
            return;
        };
        self.forward(
            &room,
            RoomCommand::Seat {
                entity_id,
                name: name.clone(),
                downlink,
            },
        );
        self.emit(ServerEvent::PlayerJoined {
            entity_id,
            room,
            name,
        });
    }

    fn forward(&self, room: &str, command: RoomCommand) {
        match self.rooms.get(room) {
            Some(sender) => {
                if sender.send(command).is_err() {
                    log::warn!("room {room} is no longer running");
                }
            }
            None => log::debug!("no task for room {room}"),
        }
    }

    fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }
}
