//! Outbound seam for flushed payloads.

use std::collections::VecDeque;
use std::convert::Infallible;

/// Carries encoded payloads from an authority to its observers.
///
/// Delivery, retry and backpressure are the implementor's business. A
/// returned error leaves the sender's pending events in place.
pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(&mut self, payload: Vec<u8>) -> Result<(), Self::Error>;
}

/// In-memory outbox. Payloads queue up until popped.
#[derive(Clone, Debug, Default)]
pub struct QueueTransport {
    outbox: VecDeque<Vec<u8>>,
}

impl QueueTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop_front(&mut self) -> Option<Vec<u8>> {
        self.outbox.pop_front()
    }

    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }

    /// Take every queued payload, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Vec<u8>> + '_ {
        self.outbox.drain(..)
    }
}

impl Transport for QueueTransport {
    type Error = Infallible;

    fn send(&mut self, payload: Vec<u8>) -> Result<(), Self::Error> {
        self.outbox.push_back(payload);
        Ok(())
    }
}
