//! Error types for taulib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer,
//! device-reported and locally detected errors are all captured here.

use crate::status::ResponseStatus;

/// The error type for all taulib operations.
///
/// Variants cover the failure modes encountered when talking to a camera
/// core through the serial bridge: physical transport failures, timeouts
/// (including replies that never arrived intact), statuses reported by the
/// camera firmware, and arguments rejected before anything was sent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, bridge channel).
    #[error("transport error: {0}")]
    Transport(String),

    /// A protocol-level error (reply payload with an unexpected shape).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// No trustworthy response arrived within the deadline.
    ///
    /// Also reported when every reply to a command failed its checksum.
    /// This typically indicates the camera is still booting, the baud rate
    /// is wrong, or the bridge is not forwarding the serial channel.
    #[error("timeout waiting for response")]
    Timeout,

    /// The camera decoded the command and rejected it with a non-OK status.
    #[error("device rejected command: {0}")]
    Device(ResponseStatus),

    /// The requested operation is not supported by this camera or setting.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An argument failed local validation; no frame was sent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A lens or range switch is in progress; no frame was sent.
    #[error("device busy: calibration switch in progress")]
    DeviceBusy,

    /// No connection to the camera has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the camera was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Project this error onto the camera's status vocabulary.
    ///
    /// Timeouts map to [`ResponseStatus::TimeoutError`] and device
    /// rejections to the status the firmware reported. Errors that never
    /// involved a camera reply return `None`.
    pub fn status(&self) -> Option<ResponseStatus> {
        match self {
            Error::Timeout => Some(ResponseStatus::TimeoutError),
            Error::Device(status) => Some(*status),
            _ => None,
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_timeout() {
        assert_eq!(Error::Timeout.to_string(), "timeout waiting for response");
    }

    #[test]
    fn error_display_device() {
        let e = Error::Device(ResponseStatus::RangeError);
        assert_eq!(e.to_string(), "device rejected command: RANGE_ERROR");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("contrast 256 outside 0..=255".into());
        assert_eq!(e.to_string(), "invalid parameter: contrast 256 outside 0..=255");
    }

    #[test]
    fn error_display_busy() {
        assert_eq!(
            Error::DeviceBusy.to_string(),
            "device busy: calibration switch in progress"
        );
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn status_projection() {
        assert_eq!(Error::Timeout.status(), Some(ResponseStatus::TimeoutError));
        assert_eq!(
            Error::Device(ResponseStatus::WriteOnly).status(),
            Some(ResponseStatus::WriteOnly)
        );
        assert_eq!(Error::DeviceBusy.status(), None);
        assert_eq!(Error::InvalidParameter("x".into()).status(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
