//! Transport trait for camera communication.
//!
//! The [`Transport`] trait abstracts over the serial channel to the camera
//! core. In production this is the serial port exposed by the bridge; in
//! tests it is the scripted `MockTransport` from `taulib-test-harness`.
//!
//! The protocol engine in `taulib-wic` operates on a `Transport` rather than
//! on a concrete port, so it has no dependency on any streaming SDK object
//! graph.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a camera.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Framing, checksums and request pairing are handled by the
/// session that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the camera.
    ///
    /// Implementations should block until all bytes have been handed to
    /// the underlying channel.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the camera into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
