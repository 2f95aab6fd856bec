//! Crossbeam-backed channel carrying scan events to a front end.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Event;

/// Sending half, handed to the scanner
///
/// Cheap to clone. Sending never blocks on an unbounded channel and never
/// fails: once the receiver is gone, events are dropped.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    pub fn send(&self, event: Event) {
        // nobody listening is fine
        let _ = self.inner.send(event);
    }
}

/// Receiving half, held by whoever shows progress
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Next event, `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Events until every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Constructors for sender/receiver pairs
pub struct EventChannel;

impl EventChannel {
    /// Unbounded pair; scan events are small
    pub fn new() -> (EventSender, EventReceiver) {
        Self::wrap(unbounded())
    }

    /// Pair holding at most `capacity` pending events
    ///
    /// The scanner waits when the receiver falls behind.
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        Self::wrap(bounded(capacity))
    }

    fn wrap((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
        (EventSender { inner: sender }, EventReceiver { inner: receiver })
    }
}

/// A sender whose events go nowhere
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
