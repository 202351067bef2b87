//! Mock transport for deterministic testing of protocol engines.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs. This lets you test frame encoding, retry policy,
//! status propagation and busy gating without real hardware.
//!
//! The mock's state is shared with any [`MockHandle`] obtained from
//! [`MockTransport::handle`], so a test can keep scripting expectations and
//! counting sent frames after the transport has been boxed and handed to a
//! camera.
//!
//! # Example
//!
//! ```
//! use taulib_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! let handle = mock.handle();
//! // When the engine sends this request, reply with this response.
//! handle.expect(&[0x6E, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x2F, 0x4A, 0x00, 0x00],
//!               &[0x6E, 0x00, 0x00, 0x0B, 0x00, 0x02, 0x0F, 0x08, 0x00, 0x01, 0x10, 0x21]);
//! assert_eq!(handle.remaining_expectations(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use taulib_core::error::{Error, Result};
use taulib_core::transport::Transport;
use tokio::time::Instant;

/// How often an empty `receive()` checks for injected bytes.
const RECEIVE_POLL: Duration = Duration::from_millis(1);

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to return once the matching request is received. Empty
    /// means the camera stays silent.
    response: Vec<u8>,
}

#[derive(Debug)]
struct MockState {
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    pending: VecDeque<u8>,
    connected: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockState {
    fn new() -> Self {
        MockState {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock [`Transport`] for testing protocol engines without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation. The
/// corresponding response is then returned by subsequent `receive()` calls.
/// A `receive()` with nothing pending waits up to its timeout for bytes
/// queued through [`MockHandle::inject`], then fails with
/// [`Error::Timeout`].
///
/// If no expectation matches or the queue is exhausted, `send()` fails with
/// [`Error::Protocol`].
#[derive(Debug)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Shared view of a [`MockTransport`]'s script and sent-frame log.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            state: Arc::new(Mutex::new(MockState::new())),
        }
    }

    /// Return a handle sharing this transport's state.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.handle().expect(request, response);
    }

    /// Return a copy of all data that has been sent through this transport.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.handle().sent_data()
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.handle().remaining_expectations()
    }

    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        lock(&self.state).connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, subsequent
    /// `receive()` calls return `response`.
    pub fn expect(&self, request: &[u8], response: &[u8]) {
        lock(&self.state).expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Expect `request` and never answer it.
    pub fn expect_silence(&self, request: &[u8]) {
        self.expect(request, &[]);
    }

    /// Queue unsolicited bytes, as if the camera sent them on its own
    /// (for example the late reply to an abandoned command).
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.state).pending.extend(bytes.iter().copied());
    }

    /// Return a copy of all data that has been sent, one entry per `send()`.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        lock(&self.state).sent_log.clone()
    }

    /// Number of `send()` calls so far.
    pub fn sent_count(&self) -> usize {
        lock(&self.state).sent_log.len()
    }

    pub fn remaining_expectations(&self) -> usize {
        lock(&self.state).expectations.len()
    }

    /// Bytes queued for `receive()` that nobody has read yet.
    pub fn unread_bytes(&self) -> usize {
        lock(&self.state).pending.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(Error::NotConnected);
        }

        state.sent_log.push(data.to_vec());

        let Some(expectation) = state.expectations.pop_front() else {
            return Err(Error::Protocol(
                "no more expectations in mock transport".into(),
            ));
        };
        if data != expectation.request.as_slice() {
            return Err(Error::Protocol(format!(
                "unexpected send data: expected {:02X?}, got {:02X?}",
                expectation.request, data
            )));
        }
        state.pending.extend(expectation.response);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut state = lock(&self.state);
                if !state.connected {
                    return Err(Error::NotConnected);
                }
                if !state.pending.is_empty() {
                    let n = state.pending.len().min(buf.len());
                    for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
                        *slot = byte;
                    }
                    return Ok(n);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout);
            }
            tokio::time::sleep(remaining.min(RECEIVE_POLL)).await;
        }
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        state.connected = false;
        state.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        let request = &[0x6E, 0x00, 0x00, 0x00];
        let response = &[0x6E, 0x00, 0x00, 0x00, 0x00, 0x00];

        mock.expect(request, response);
        mock.send(request).await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();

        assert_eq!(n, response.len());
        assert_eq!(&buf[..n], response);
    }

    #[tokio::test]
    async fn handle_sees_sends_after_transport_is_boxed() {
        let mock = MockTransport::new();
        let handle = mock.handle();
        handle.expect(&[0x01, 0x02], &[0xFF]);
        handle.expect(&[0x03, 0x04], &[0xFE]);

        let mut boxed: Box<dyn Transport> = Box::new(mock);
        boxed.send(&[0x01, 0x02]).await.unwrap();
        boxed.send(&[0x03, 0x04]).await.unwrap();

        assert_eq!(handle.sent_count(), 2);
        assert_eq!(handle.sent_data()[1], vec![0x03, 0x04]);
        assert_eq!(handle.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xFF]);

        let result = mock.send(&[0x99]).await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();

        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::Protocol(_)));
        assert_eq!(mock.sent_data().len(), 1);
    }

    #[tokio::test]
    async fn silent_expectation_times_out() {
        let mut mock = MockTransport::new();
        mock.handle().expect_silence(&[0x01]);
        mock.send(&[0x01]).await.unwrap();

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn receive_waits_for_late_bytes() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.inject(&[0x6E, 0x00]);
        });

        let mut buf = [0u8; 8];
        let n = mock.receive(&mut buf, Duration::from_millis(500)).await.unwrap();
        assert_eq!(&buf[..n], &[0x6E, 0x00]);
    }

    #[tokio::test]
    async fn injected_bytes_precede_next_response() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.inject(&[0xAA]);
        handle.expect(&[0x01], &[0xBB]);
        mock.send(&[0x01]).await.unwrap();

        let mut buf = [0u8; 8];
        let n = mock.receive(&mut buf, Duration::from_millis(10)).await.unwrap();
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);
        assert_eq!(handle.unread_bytes(), 0);
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(&[0x01]).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_set_connected() {
        let mut mock = MockTransport::new();
        mock.set_connected(false);

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, Duration::from_millis(10)).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.expect(&[0x01], &[0xAA, 0xBB, 0xCC, 0xDD]);
        mock.send(&[0x01]).await.unwrap();

        let mut buf = [0u8; 2];
        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0xAA, 0xBB]);

        let n = mock
            .receive(&mut buf, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(&buf[..n], &[0xCC, 0xDD]);
    }
}
