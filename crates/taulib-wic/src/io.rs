//! Transport session: the IO task that owns the camera's serial channel.
//!
//! Camera methods never touch the transport. They submit a [`Request`] to a
//! single IO task over an mpsc queue and await the reply on a oneshot
//! channel. Because the task handles one request at a time, exactly one
//! command frame is ever outstanding; concurrent callers are queued.
//!
//! The IO task handles: the command/response exchange against a deadline,
//! resynchronisation on the process-code byte, discarding late replies to
//! abandoned commands, at most one resend per command, rejecting commands
//! while a lens switch holds the camera, and draining stray frames while
//! idle.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use taulib_core::error::{Error, Result};
use taulib_core::transport::Transport;

use crate::frame::{self, CommandFrame, DecodeError, ResponseFrame};
use crate::lens::SwitchState;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for the IO task.
#[derive(Debug, Clone)]
pub(crate) struct IoConfig {
    /// Deadline for one command/response exchange, measured from the send.
    pub command_timeout: Duration,
    /// Resend a command once after its reply failed the CRC.
    pub checksum_retry: bool,
    /// Resend a read once after it got no reply at all.
    pub retry_reads: bool,
}

/// How the session treats a queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommandKind {
    /// Idempotent query; may be resent after silence.
    Read,
    /// Write or action; never resent after silence.
    Write,
    /// Step of a lens/range switch; runs while the switch holds the camera.
    Switch,
}

/// A request sent from camera methods to the IO task.
pub(crate) enum Request {
    /// Send a command and wait for its OK reply.
    Command {
        frame: CommandFrame,
        kind: CommandKind,
        timeout: Duration,
        reply: oneshot::Sender<Result<ResponseFrame>>,
    },
    /// Graceful shutdown; returns the transport.
    Shutdown {
        reply: oneshot::Sender<Box<dyn Transport>>,
    },
}

/// Cloneable handle for submitting commands to the IO task.
#[derive(Clone)]
pub(crate) struct SessionHandle {
    cmd_tx: mpsc::Sender<Request>,
    command_timeout: Duration,
    switching: bool,
}

impl SessionHandle {
    /// Send a write or action and await its reply.
    ///
    /// Resolves to the reply frame when the camera answered OK, to
    /// [`Error::Device`] with the reported status otherwise, and to
    /// [`Error::Timeout`] when no intact reply arrived. A handle from
    /// [`for_switch`](Self::for_switch) submits switch steps instead.
    pub async fn command(&self, frame: CommandFrame) -> Result<ResponseFrame> {
        let kind = if self.switching {
            CommandKind::Switch
        } else {
            CommandKind::Write
        };
        self.submit(frame, kind).await
    }

    /// Send an idempotent query and await its reply.
    pub async fn read(&self, frame: CommandFrame) -> Result<ResponseFrame> {
        self.submit(frame, CommandKind::Read).await
    }

    /// A handle whose commands bypass the busy check, for the task that
    /// runs a lens/range switch.
    pub fn for_switch(&self) -> SessionHandle {
        SessionHandle {
            switching: true,
            ..self.clone()
        }
    }

    async fn submit(&self, frame: CommandFrame, kind: CommandKind) -> Result<ResponseFrame> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(Request::Command {
                frame,
                kind,
                timeout: self.command_timeout,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::NotConnected)?;

        match reply_rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::NotConnected),
        }
    }
}

/// Owner of the IO task. Stored inside `WicCamera`.
pub(crate) struct SessionIo {
    pub handle: SessionHandle,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}

impl SessionIo {
    /// Shut down the IO task and recover the transport.
    pub async fn shutdown(&self) -> Result<Box<dyn Transport>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.handle
            .cmd_tx
            .send(Request::Shutdown { reply: reply_tx })
            .await
            .map_err(|_| Error::NotConnected)?;
        reply_rx.await.map_err(|_| Error::NotConnected)
    }
}

// ---------------------------------------------------------------------------
// Spawn
// ---------------------------------------------------------------------------

/// Spawn the IO task. Returns the owner handle for sending commands.
///
/// While `switch` reports a switch in progress, every command except the
/// switch's own steps fails with [`Error::DeviceBusy`] without being sent.
pub(crate) fn spawn_io_task(
    transport: Box<dyn Transport>,
    config: IoConfig,
    switch: watch::Receiver<SwitchState>,
) -> SessionIo {
    let (cmd_tx, cmd_rx) = mpsc::channel::<Request>(32);
    let cancel = CancellationToken::new();
    let handle = SessionHandle {
        cmd_tx,
        command_timeout: config.command_timeout,
        switching: false,
    };

    let task = tokio::spawn(io_loop(transport, config, switch, cmd_rx, cancel.clone()));

    SessionIo {
        handle,
        cancel,
        task,
    }
}

// ---------------------------------------------------------------------------
// IO loop
// ---------------------------------------------------------------------------

/// Maximum idle buffer size before reset to prevent unbounded growth.
const MAX_IDLE_BUF: usize = 4096;

/// How long the idle branch waits for stray bytes per poll.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// The main IO loop. Runs as a spawned Tokio task.
///
/// Uses `tokio::select! { biased; }` to prioritize:
/// 1. Cancellation
/// 2. Command dispatch
/// 3. Idle draining of stray frames
async fn io_loop(
    mut transport: Box<dyn Transport>,
    config: IoConfig,
    switch: watch::Receiver<SwitchState>,
    mut cmd_rx: mpsc::Receiver<Request>,
    cancel: CancellationToken,
) {
    let mut idle_buf = Vec::new();

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("IO task cancelled");
                break;
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Request::Command { frame, kind, timeout, reply }) => {
                        if kind != CommandKind::Switch && switch.borrow().is_busy() {
                            debug!(function = ?frame.function(), "rejecting command during lens switch");
                            let _ = reply.send(Err(Error::DeviceBusy));
                            continue;
                        }
                        if !idle_buf.is_empty() {
                            debug!(len = idle_buf.len(), "discarding partial idle data before command");
                            idle_buf.clear();
                        }
                        let result = execute_command(&mut *transport, &frame, kind, timeout, &config).await;
                        let _ = reply.send(result);
                    }
                    Some(Request::Shutdown { reply }) => {
                        debug!("IO task shutdown requested");
                        let _ = reply.send(transport);
                        return;
                    }
                    None => {
                        debug!("all command senders dropped, exiting IO task");
                        break;
                    }
                }
            }

            _ = async {
                let mut buf = [0u8; 256];
                match transport.receive(&mut buf, IDLE_POLL).await {
                    Ok(n) if n > 0 => {
                        idle_buf.extend_from_slice(&buf[..n]);
                        if idle_buf.len() > MAX_IDLE_BUF {
                            tracing::warn!(len = idle_buf.len(), "idle buffer overflow, resetting");
                            idle_buf.clear();
                            return;
                        }
                        drain_idle_frames(&mut idle_buf);
                    }
                    _ => {
                        // Nothing arrived; yield so commands and
                        // cancellation are checked.
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            } => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Command execution
// ---------------------------------------------------------------------------

/// How one send/receive attempt ended without producing a result.
enum AttemptEnd {
    /// The deadline passed and no corrupt reply was seen.
    Silent,
    /// A reply arrived but failed its CRC.
    Corrupt,
}

/// Execute one command on the transport.
///
/// A command is sent at most twice. The resend happens after a corrupt
/// reply when `checksum_retry` is set, or after silence when the command
/// is a read and `retry_reads` is set. Whatever the cause, once the resend
/// is used up the command is reported as timed out. Non-OK statuses are
/// returned as [`Error::Device`] and never resent.
async fn execute_command(
    transport: &mut dyn Transport,
    command: &CommandFrame,
    kind: CommandKind,
    timeout: Duration,
    config: &IoConfig,
) -> Result<ResponseFrame> {
    let bytes = command.encode();
    let function = command.function();
    let mut resent = false;

    loop {
        transport.send(&bytes).await?;
        debug!(?function, len = bytes.len(), resent, "command sent");

        let end = match await_reply(transport, function.code(), timeout).await? {
            Ok(frame) if frame.status.is_ok() => return Ok(frame),
            Ok(frame) => {
                debug!(?function, status = %frame.status, "camera rejected command");
                return Err(Error::Device(frame.status));
            }
            Err(end) => end,
        };

        let resend = !resent
            && match end {
                AttemptEnd::Corrupt => config.checksum_retry,
                AttemptEnd::Silent => kind == CommandKind::Read && config.retry_reads,
            };
        if !resend {
            debug!(?function, timeout_ms = timeout.as_millis(), "no intact reply");
            return Err(Error::Timeout);
        }
        match end {
            AttemptEnd::Corrupt => debug!(?function, "resending command after corrupt reply"),
            AttemptEnd::Silent => debug!(?function, "read got no reply, resending once"),
        }
        resent = true;
    }
}

/// Read until a reply to `function` arrives, a corrupt reply is seen, or
/// the deadline passes. Transport failures other than timeouts are
/// returned as the outer error.
async fn await_reply(
    transport: &mut dyn Transport,
    function: u8,
    timeout: Duration,
) -> Result<std::result::Result<ResponseFrame, AttemptEnd>> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; 256];
    let mut response_buf: Vec<u8> = Vec::new();
    let mut saw_corruption = false;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        match transport.receive(&mut buf, remaining).await {
            Ok(n) => response_buf.extend_from_slice(&buf[..n]),
            Err(Error::Timeout) => break,
            Err(e) => return Err(e),
        }

        loop {
            match next_frame(&mut response_buf) {
                Scan::Frame(frame) if frame.function == function => return Ok(Ok(frame)),
                Scan::Frame(frame) => {
                    debug!(
                        function = frame.function,
                        status = %frame.status,
                        "discarding reply to an earlier command"
                    );
                }
                Scan::CorruptFrame => {
                    tracing::warn!(function, "reply failed checksum");
                    return Ok(Err(AttemptEnd::Corrupt));
                }
                Scan::CorruptHeader => saw_corruption = true,
                Scan::NeedMore => break,
            }
        }
    }

    if saw_corruption {
        Ok(Err(AttemptEnd::Corrupt))
    } else {
        Ok(Err(AttemptEnd::Silent))
    }
}

/// Outcome of scanning a receive buffer for the next frame.
enum Scan {
    Frame(ResponseFrame),
    /// A complete frame whose trailing CRC failed; it has been discarded.
    CorruptFrame,
    /// A sync byte whose header CRC failed; one byte has been discarded.
    CorruptHeader,
    NeedMore,
}

/// Pull the next frame out of `buf`, discarding leading garbage and any
/// bytes identified as corrupt.
fn next_frame(buf: &mut Vec<u8>) -> Scan {
    match frame::find_sync(buf) {
        Some(0) => {}
        Some(pos) => {
            debug!(skipped = pos, "skipping bytes before sync");
            buf.drain(..pos);
        }
        None => {
            if !buf.is_empty() {
                debug!(skipped = buf.len(), "skipping bytes without sync");
                buf.clear();
            }
            return Scan::NeedMore;
        }
    }

    match frame::decode_frame(buf) {
        Ok((frame, consumed)) => {
            buf.drain(..consumed);
            Scan::Frame(frame)
        }
        Err(DecodeError::Truncated { .. }) => Scan::NeedMore,
        Err(DecodeError::ChecksumMismatch { consumed, .. }) => {
            buf.drain(..consumed);
            if consumed > 1 {
                Scan::CorruptFrame
            } else {
                Scan::CorruptHeader
            }
        }
        Err(DecodeError::UnexpectedProcessCode(_)) => {
            buf.drain(..1);
            Scan::CorruptHeader
        }
    }
}

/// Drain and discard complete frames that arrived while no command was
/// outstanding, typically late replies to commands that already timed out.
fn drain_idle_frames(buf: &mut Vec<u8>) {
    loop {
        match next_frame(buf) {
            Scan::Frame(frame) => {
                debug!(
                    function = frame.function,
                    status = %frame.status,
                    "discarding late reply received while idle"
                );
            }
            Scan::CorruptFrame | Scan::CorruptHeader => {
                debug!("discarding corrupt data received while idle");
            }
            Scan::NeedMore => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FunctionCode, encode_frame, encode_response};
    use crate::lens::SwitchTarget;
    use taulib_core::RangeMode;
    use taulib_core::ResponseStatus;
    use taulib_test_harness::{MockHandle, MockTransport};

    fn spawn_mock() -> (SessionIo, MockHandle) {
        let (io, mock, _switch) = spawn_mock_with_switch();
        (io, mock)
    }

    fn spawn_mock_with_switch() -> (SessionIo, MockHandle, watch::Sender<SwitchState>) {
        let mock = MockTransport::new();
        let handle = mock.handle();
        let switch = watch::Sender::new(SwitchState::Idle);
        let io = spawn_io_task(
            Box::new(mock),
            IoConfig {
                command_timeout: Duration::from_millis(100),
                checksum_retry: true,
                retry_reads: true,
            },
            switch.subscribe(),
        );
        (io, handle, switch)
    }

    fn ok_reply(function: FunctionCode, payload: &[u8]) -> Vec<u8> {
        encode_response(ResponseStatus::Ok, function, payload).unwrap()
    }

    fn query(function: FunctionCode) -> Vec<u8> {
        encode_frame(function, &[]).unwrap()
    }

    fn corrupt(mut bytes: Vec<u8>) -> Vec<u8> {
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        bytes
    }

    // ---------------------------------------------------------------
    // Basic exchange
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn command_returns_ok_reply() {
        let (io, mock) = spawn_mock();
        mock.expect(&query(FunctionCode::Contrast), &ok_reply(FunctionCode::Contrast, &[0x00, 0x80]));

        let frame = io
            .handle
            .command(CommandFrame::bare(FunctionCode::Contrast))
            .await
            .unwrap();
        assert_eq!(frame.payload, vec![0x00, 0x80]);
        assert_eq!(mock.sent_count(), 1);
    }

    #[tokio::test]
    async fn device_status_is_surfaced_without_retry() {
        let (io, mock) = spawn_mock();
        let reply = encode_response(ResponseStatus::WriteOnly, FunctionCode::Contrast, &[]).unwrap();
        mock.expect(&query(FunctionCode::Contrast), &reply);

        let result = io.handle.command(CommandFrame::bare(FunctionCode::Contrast)).await;
        assert!(matches!(result, Err(Error::Device(ResponseStatus::WriteOnly))));
        assert_eq!(mock.sent_count(), 1);
    }

    #[tokio::test]
    async fn silence_is_a_timeout_without_retry() {
        let (io, mock) = spawn_mock();
        mock.expect_silence(&query(FunctionCode::Brightness));

        let result = io.handle.command(CommandFrame::bare(FunctionCode::Brightness)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.sent_count(), 1);
    }

    // ---------------------------------------------------------------
    // Corruption and resynchronisation
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn corrupt_reply_is_resent_once() {
        let (io, mock) = spawn_mock();
        let good = ok_reply(FunctionCode::Brightness, &[0x20, 0x00]);
        mock.expect(&query(FunctionCode::Brightness), &corrupt(good.clone()));
        mock.expect(&query(FunctionCode::Brightness), &good);

        let frame = io
            .handle
            .command(CommandFrame::bare(FunctionCode::Brightness))
            .await
            .unwrap();
        assert_eq!(frame.payload, vec![0x20, 0x00]);
        assert_eq!(mock.sent_count(), 2);
    }

    #[tokio::test]
    async fn repeated_corruption_becomes_timeout() {
        let (io, mock) = spawn_mock();
        let bad = corrupt(ok_reply(FunctionCode::Brightness, &[0x20, 0x00]));
        mock.expect(&query(FunctionCode::Brightness), &bad);
        mock.expect(&query(FunctionCode::Brightness), &bad);

        let result = io.handle.command(CommandFrame::bare(FunctionCode::Brightness)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.sent_count(), 2);
    }

    #[tokio::test]
    async fn read_is_resent_once_after_silence() {
        let (io, mock) = spawn_mock();
        let query_bytes = query(FunctionCode::Brightness);
        mock.expect_silence(&query_bytes);
        mock.expect(&query_bytes, &ok_reply(FunctionCode::Brightness, &[0x00, 0x05]));

        let frame = io
            .handle
            .read(CommandFrame::bare(FunctionCode::Brightness))
            .await
            .unwrap();
        assert_eq!(frame.payload, vec![0x00, 0x05]);
        assert_eq!(mock.sent_count(), 2);
    }

    #[tokio::test]
    async fn read_resend_is_shared_with_checksum_resend() {
        let (io, mock) = spawn_mock();
        let query_bytes = query(FunctionCode::Brightness);
        let bad = corrupt(ok_reply(FunctionCode::Brightness, &[0x20, 0x00]));
        mock.expect(&query_bytes, &bad);
        mock.expect_silence(&query_bytes);
        mock.expect(&query_bytes, &bad);

        let result = io.handle.read(CommandFrame::bare(FunctionCode::Brightness)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.sent_count(), 2);
    }

    #[tokio::test]
    async fn read_with_corrupt_replies_is_sent_twice() {
        let (io, mock) = spawn_mock();
        let query_bytes = query(FunctionCode::Brightness);
        let bad = corrupt(ok_reply(FunctionCode::Brightness, &[0x20, 0x00]));
        for _ in 0..4 {
            mock.expect(&query_bytes, &bad);
        }

        let result = io.handle.read(CommandFrame::bare(FunctionCode::Brightness)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.sent_count(), 2);
        assert_eq!(mock.remaining_expectations(), 2);
    }

    // ---------------------------------------------------------------
    // Partial replies
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn split_reply_is_reassembled_before_deadline() {
        let (io, mock) = spawn_mock();
        let reply = ok_reply(FunctionCode::Contrast, &[0x00, 0x2A]);
        let (head, tail) = reply.split_at(5);
        mock.expect(&query(FunctionCode::Contrast), head);

        let late = mock.clone();
        let tail = tail.to_vec();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            late.inject(&tail);
        });

        let frame = io
            .handle
            .command(CommandFrame::bare(FunctionCode::Contrast))
            .await
            .unwrap();
        assert_eq!(frame.payload, vec![0x00, 0x2A]);
        assert_eq!(mock.sent_count(), 1);
    }

    #[tokio::test]
    async fn truncated_reply_times_out() {
        let (io, mock) = spawn_mock();
        let reply = ok_reply(FunctionCode::Contrast, &[0x00, 0x2A]);
        mock.expect(&query(FunctionCode::Contrast), &reply[..reply.len() - 3]);

        let result = io.handle.command(CommandFrame::bare(FunctionCode::Contrast)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        assert_eq!(mock.sent_count(), 1);
    }

    #[tokio::test]
    async fn late_reply_to_other_command_is_skipped() {
        let (io, mock) = spawn_mock();
        let mut reply = ok_reply(FunctionCode::Contrast, &[0x00, 0x10]);
        reply.extend(ok_reply(FunctionCode::Brightness, &[0x01, 0x00]));
        mock.expect(&query(FunctionCode::Brightness), &reply);

        let frame = io
            .handle
            .command(CommandFrame::bare(FunctionCode::Brightness))
            .await
            .unwrap();
        assert_eq!(frame.function_code(), Some(FunctionCode::Brightness));
        assert_eq!(frame.payload, vec![0x01, 0x00]);
    }

    #[tokio::test]
    async fn leading_garbage_is_skipped() {
        let (io, mock) = spawn_mock();
        let mut reply = vec![0x00, 0xFF, 0x6E, 0x13];
        reply.extend(ok_reply(FunctionCode::DoFfc, &[]));
        mock.expect(&query(FunctionCode::DoFfc), &reply);

        let result = io.handle.command(CommandFrame::bare(FunctionCode::DoFfc)).await;
        assert!(result.is_ok());
        assert_eq!(mock.sent_count(), 1);
    }

    #[tokio::test]
    async fn stray_frames_are_drained_while_idle() {
        let (io, mock) = spawn_mock();
        mock.inject(&ok_reply(FunctionCode::Contrast, &[0x00, 0x10]));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(mock.unread_bytes(), 0);

        mock.expect(&query(FunctionCode::NoOp), &ok_reply(FunctionCode::NoOp, &[]));
        assert!(io.handle.command(CommandFrame::bare(FunctionCode::NoOp)).await.is_ok());
    }

    // ---------------------------------------------------------------
    // Single flight
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn concurrent_commands_are_queued_not_interleaved() {
        let (io, mock) = spawn_mock();
        mock.expect(&query(FunctionCode::Contrast), &ok_reply(FunctionCode::Contrast, &[0x00, 0x01]));
        mock.expect(&query(FunctionCode::Brightness), &ok_reply(FunctionCode::Brightness, &[0x00, 0x02]));

        let a = io.handle.clone();
        let b = io.handle.clone();
        let (ra, rb) = tokio::join!(
            a.command(CommandFrame::bare(FunctionCode::Contrast)),
            b.command(CommandFrame::bare(FunctionCode::Brightness)),
        );
        assert_eq!(ra.unwrap().payload, vec![0x00, 0x01]);
        assert_eq!(rb.unwrap().payload, vec![0x00, 0x02]);

        let sent = mock.sent_data();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], query(FunctionCode::Contrast));
        assert_eq!(sent[1], query(FunctionCode::Brightness));
    }

    // ---------------------------------------------------------------
    // Lens switch gate
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn commands_rejected_while_switch_in_progress() {
        let (io, mock, switch) = spawn_mock_with_switch();
        switch.send_replace(SwitchState::InProgress {
            target: SwitchTarget {
                lens: "019mm".into(),
                range: RangeMode::Middle,
            },
        });

        let result = io.handle.read(CommandFrame::bare(FunctionCode::Contrast)).await;
        assert!(matches!(result, Err(Error::DeviceBusy)));
        let result = io.handle.command(CommandFrame::bare(FunctionCode::DoFfc)).await;
        assert!(matches!(result, Err(Error::DeviceBusy)));
        assert_eq!(mock.sent_count(), 0);

        mock.expect(&query(FunctionCode::NoOp), &ok_reply(FunctionCode::NoOp, &[]));
        let steps = io.handle.for_switch();
        assert!(steps.command(CommandFrame::bare(FunctionCode::NoOp)).await.is_ok());
        assert_eq!(mock.sent_count(), 1);

        switch.send_replace(SwitchState::Idle);
        mock.expect(&query(FunctionCode::Contrast), &ok_reply(FunctionCode::Contrast, &[0x00, 0x01]));
        assert!(io.handle.read(CommandFrame::bare(FunctionCode::Contrast)).await.is_ok());
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn shutdown_returns_transport() {
        let (io, _mock) = spawn_mock();
        let transport = io.shutdown().await.unwrap();
        assert!(transport.is_connected());
        let _ = io.task.await;
    }

    #[tokio::test]
    async fn cancelled_session_reports_not_connected() {
        let (io, _mock) = spawn_mock();
        io.cancel.cancel();
        let _ = io.task.await;
        let result = io.handle.command(CommandFrame::bare(FunctionCode::NoOp)).await;
        assert!(matches!(result, Err(Error::NotConnected)));
    }
}
