//! Link-layer packet I/O
//!
//! The dispatcher talks to interfaces through the [`Capture`] trait so the
//! forwarding loop can run against real AF_PACKET sockets or in-memory
//! links in tests.

mod af_packet;

pub use af_packet::AfPacketSocket;

use crate::Result;
use std::future::Future;

/// Information about a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxInfo {
    /// Number of bytes received
    pub len: usize,
}

/// A link that can receive and transmit raw Ethernet frames
///
/// Methods take `&self` so one link can be shared between its receive task
/// and the dispatcher that transmits on it.
pub trait Capture: Send + Sync {
    /// Receive one frame into the provided buffer
    fn recv(&self, buf: &mut [u8]) -> impl Future<Output = Result<RxInfo>> + Send;

    /// Transmit one frame
    fn send(&self, buf: &[u8]) -> impl Future<Output = Result<usize>> + Send;
}
