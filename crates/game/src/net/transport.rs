use crate::snapshot::EntityId;

use super::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Peer {
    Server,
    Client(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reliability {
    /// Never dropped, delivered in send order.
    Reliable,
    /// May be lost or overtaken by later messages.
    Unreliable,
}

/// Outgoing half of the network boundary. Sending never blocks; delivery
/// happens asynchronously on the other side.
pub trait Transport {
    fn send(&mut self, to: Peer, message: &Message, reliability: Reliability);
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, to: Peer, message: &Message, reliability: Reliability) {
        (**self).send(to, message, reliability);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub to: Peer,
    pub message: Message,
    pub reliability: Reliability,
}

/// In-memory outbox that records every send for later inspection.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    outbox: Vec<Envelope>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.outbox)
    }

    /// Removes and returns the messages addressed to `peer`, in send order.
    pub fn take_for(&mut self, peer: Peer) -> Vec<Message> {
        let (mine, rest): (Vec<_>, Vec<_>) =
            self.outbox.drain(..).partition(|envelope| envelope.to == peer);
        self.outbox = rest;
        mine.into_iter().map(|envelope| envelope.message).collect()
    }

    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, to: Peer, message: &Message, reliability: Reliability) {
        self.outbox.push(Envelope {
            to,
            message: message.clone(),
            reliability,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_for_keeps_other_recipients_queued() {
        let mut transport = LoopbackTransport::new();
        transport.send(Peer::Client(1), &Message::GameJoin, Reliability::Reliable);
        transport.send(Peer::Client(2), &Message::LeaveRoom, Reliability::Reliable);
        transport.send(Peer::Client(1), &Message::LeaveRoom, Reliability::Unreliable);

        let first = transport.take_for(Peer::Client(1));

        assert_eq!(first, vec![Message::GameJoin, Message::LeaveRoom]);
        assert_eq!(transport.len(), 1);
        assert_eq!(transport.drain()[0].to, Peer::Client(2));
        assert!(transport.is_empty());
    }
}
