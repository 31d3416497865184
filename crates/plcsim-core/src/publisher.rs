//! The [`Publisher`] trait plus null and bounded channel
//! implementations.
//!
//! The engine knows nothing about protocols; it hands tag descriptors
//! to a `Publisher` once at startup and streams observed samples into
//! it every tick. Registration returns an opaque [`PublisherHandle`]
//! the tick loop keys its publishes with, so the tag model itself stays
//! free of any publisher bookkeeping.
//!
//! Publish failures are reported, not fatal: the tick loop counts them
//! and keeps going, which keeps a slow or dead consumer from stalling
//! the simulation.

use tokio::sync::mpsc;
use tracing::trace;

use plcsim_types::{TagDescriptor, TagSample};

/// Opaque per-tag handle returned by [`Publisher::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublisherHandle(usize);

/// Errors surfaced by a Publisher.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The consumer cannot accept the sample right now; the sample is
    /// dropped and the loop continues.
    #[error("publisher buffer full, sample dropped")]
    BufferFull,

    /// The consumer has gone away; samples can never be delivered.
    #[error("publisher consumer disconnected")]
    Disconnected,

    /// A publish used a handle this Publisher never issued.
    #[error("unknown publisher handle")]
    UnknownHandle,
}

/// Downstream consumer of simulated samples.
///
/// Implementations decide what "publish" means: an in-process channel,
/// a protocol server, or nothing at all.
pub trait Publisher: Send {
    /// Register a tag at startup, yielding the handle later publishes
    /// use for it.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the consumer cannot accept the
    /// registration.
    fn register(&mut self, descriptor: &TagDescriptor) -> Result<PublisherHandle, PublishError>;

    /// Deliver one observed sample.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if the sample cannot be delivered; the
    /// caller treats this as a counted drop, not a fatal condition.
    fn publish(&mut self, handle: PublisherHandle, sample: TagSample) -> Result<(), PublishError>;
}

/// A Publisher that accepts everything and delivers nowhere.
///
/// Used when the engine runs headless and in tests that only exercise
/// the simulation itself.
#[derive(Debug, Default)]
pub struct NullPublisher {
    registered: usize,
}

impl Publisher for NullPublisher {
    fn register(&mut self, descriptor: &TagDescriptor) -> Result<PublisherHandle, PublishError> {
        trace!(address = %descriptor.address, "Registered tag with null publisher");
        let handle = PublisherHandle(self.registered);
        self.registered = self.registered.saturating_add(1);
        Ok(handle)
    }

    fn publish(&mut self, _handle: PublisherHandle, _sample: TagSample) -> Result<(), PublishError> {
        Ok(())
    }
}

/// A Publisher backed by a bounded in-process channel.
///
/// Samples are handed to the receiving side without blocking the tick
/// loop; when the consumer falls behind and the buffer fills, samples
/// are dropped with [`PublishError::BufferFull`].
#[derive(Debug)]
pub struct ChannelPublisher {
    descriptors: Vec<TagDescriptor>,
    sender: mpsc::Sender<TagSample>,
}

impl ChannelPublisher {
    /// Create a publisher with the given buffer capacity, returning the
    /// receiving side for the consumer task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<TagSample>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                descriptors: Vec::new(),
                sender,
            },
            receiver,
        )
    }

    /// The descriptors registered so far, in registration order.
    pub fn descriptors(&self) -> &[TagDescriptor] {
        &self.descriptors
    }
}

impl Publisher for ChannelPublisher {
    fn register(&mut self, descriptor: &TagDescriptor) -> Result<PublisherHandle, PublishError> {
        let handle = PublisherHandle(self.descriptors.len());
        self.descriptors.push(descriptor.clone());
        trace!(address = %descriptor.address, "Registered tag with channel publisher");
        Ok(handle)
    }

    fn publish(&mut self, handle: PublisherHandle, sample: TagSample) -> Result<(), PublishError> {
        if self.descriptors.get(handle.0).is_none() {
            return Err(PublishError::UnknownHandle);
        }
        self.sender.try_send(sample).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PublishError::BufferFull,
            mpsc::error::TrySendError::Closed(_) => PublishError::Disconnected,
        })
    }
}
