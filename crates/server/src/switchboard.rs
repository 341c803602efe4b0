use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::mpsc;

use recoil::{EntityId, Message, Peer, Reliability, SimulatedLink, Transport};

/// Encoded message plus the delivery guarantee it was sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub bytes: Vec<u8>,
    pub reliability: Reliability,
}

impl Datagram {
    pub fn encode(message: &Message, reliability: Reliability) -> Option<Self> {
        match message.encode() {
            Ok(bytes) => Some(Self { bytes, reliability }),
            Err(err) => {
                log::warn!("failed to encode {:?}: {err}", message.tag());
                None
            }
        }
    }
}

pub type Downlink = mpsc::UnboundedSender<Datagram>;

/// Traffic arriving at the lobby task.
#[derive(Debug)]
pub enum Inbound {
    Connect {
        entity_id: EntityId,
        downlink: Downlink,
    },
    Packet {
        from: EntityId,
        bytes: Vec<u8>,
    },
    Disconnect {
        entity_id: EntityId,
    },
}

/// Server-side transport: one downlink channel per connected client.
#[derive(Debug, Default)]
pub struct Switchboard {
    peers: HashMap<EntityId, Downlink>,
    sent: u64,
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&mut self, entity_id: EntityId, downlink: Downlink) {
        self.peers.insert(entity_id, downlink);
    }

    pub fn disconnect(&mut self, entity_id: EntityId) -> bool {
        self.peers.remove(&entity_id).is_some()
    }

    pub fn downlink(&self, entity_id: EntityId) -> Option<Downlink> {
        self.peers.get(&entity_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Transport for Switchboard {
    fn send(&mut self, to: Peer, message: &Message, reliability: Reliability) {
        let Peer::Client(entity_id) = to else {
            log::debug!("switchboard cannot send {:?} to the server", message.tag());
            return;
        };
        let Some(downlink) = self.peers.get(&entity_id) else {
            log::debug!("no downlink for entity {entity_id}");
            return;
        };
        let Some(datagram) = Datagram::encode(message, reliability) else {
            return;
        };
        if downlink.send(datagram).is_err() {
            log::debug!("downlink for entity {entity_id} is closed");
            return;
        }
        self.sent += 1;
    }
}

/// Client-side transport that feeds the outgoing half of a simulated link.
pub struct Uplink<'a> {
    link: &'a mut SimulatedLink<Datagram>,
    now: Instant,
}

impl<'a> Uplink<'a> {
    pub fn new(link: &'a mut SimulatedLink<Datagram>, now: Instant) -> Self {
        Self { link, now }
    }
}

impl Transport for Uplink<'_> {
    fn send(&mut self, to: Peer, message: &Message, reliability: Reliability) {
        if to != Peer::Server {
            log::debug!("clients only talk to the server; dropping {:?}", message.tag());
            return;
        }
        if let Some(datagram) = Datagram::encode(message, reliability) {
            self.link.push(self.now, datagram, reliability);
        }
    }
}

#[cfg(test)]
mod tests {
    use recoil::LinkConditions;

    use super::*;

    #[test]
    fn switchboard_delivers_encoded_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut switchboard = Switchboard::new();
        switchboard.connect(3, tx);

        switchboard.send(Peer::Client(3), &Message::GameJoin, Reliability::Reliable);
        switchboard.send(Peer::Client(9), &Message::GameJoin, Reliability::Reliable);

        let datagram = rx.try_recv().unwrap();
        assert_eq!(Message::decode(&datagram.bytes).unwrap(), Message::GameJoin);
        assert_eq!(datagram.reliability, Reliability::Reliable);
        assert!(rx.try_recv().is_err());
        assert_eq!(switchboard.sent(), 1);
    }

    #[test]
    fn closed_downlinks_are_tolerated() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut switchboard = Switchboard::new();
        switchboard.connect(1, tx);
        drop(rx);

        switchboard.send(Peer::Client(1), &Message::LeaveRoom, Reliability::Reliable);

        assert_eq!(switchboard.sent(), 0);
        assert!(switchboard.disconnect(1));
        assert_eq!(switchboard.len(), 0);
    }

    #[test]
    fn uplink_only_queues_server_bound_traffic() {
        let mut link = SimulatedLink::new(LinkConditions::default(), 1);
        let now = Instant::now();
        {
            let mut uplink = Uplink::new(&mut link, now);
            uplink.send(Peer::Server, &Message::GameJoin, Reliability::Reliable);
            uplink.send(Peer::Client(2), &Message::GameJoin, Reliability::Reliable);
        }

        let released = link.poll(now);
        assert_eq!(released.len(), 1);
        assert_eq!(Message::decode(&released[0].bytes).unwrap(), Message::GameJoin);
    }
}
