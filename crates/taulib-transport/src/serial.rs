//! Serial transport to a camera core.
//!
//! The camera's command channel is a fixed 8N1 line without flow control;
//! only the baud rate varies. The core powers up at 57 600 baud and can be
//! switched to 921 600 for faster parameter traffic.

use std::io::ErrorKind;
use std::time::Duration;

use async_trait::async_trait;
use taulib_core::error::{Error, Result};
use taulib_core::transport::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, DataBits, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, trace, warn};

/// Baud rate the camera core uses after power-up.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Baud rates the camera core accepts on its command channel.
pub const SUPPORTED_BAUD_RATES: [u32; 2] = [57_600, 921_600];

/// Options for opening the camera's serial channel.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Discard bytes left in the driver's input buffer after opening.
    pub clear_input: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            baud_rate: DEFAULT_BAUD_RATE,
            clear_input: true,
        }
    }
}

impl SerialConfig {
    fn validate(&self) -> Result<()> {
        if SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            Ok(())
        } else {
            Err(Error::InvalidParameter(format!(
                "baud rate {} not supported by the camera (expected one of {:?})",
                self.baud_rate, SUPPORTED_BAUD_RATES
            )))
        }
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected | ErrorKind::UnexpectedEof => {
            Error::ConnectionLost
        }
        _ => Error::Io(e),
    }
}

/// The serial channel of a camera core, opened through a bridge's virtual
/// COM port or a USB-serial adapter.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    path: String,
}

impl SerialTransport {
    /// Open `path` at `baud_rate` with the default options.
    ///
    /// ```no_run
    /// # use taulib_transport::SerialTransport;
    /// # async fn example() -> taulib_core::Result<()> {
    /// let transport = SerialTransport::open("/dev/ttyUSB0", 921_600).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(
            path,
            SerialConfig {
                baud_rate,
                ..SerialConfig::default()
            },
        )
        .await
    }

    pub async fn open_with_config(path: &str, config: SerialConfig) -> Result<Self> {
        config.validate()?;
        debug!(path, baud_rate = config.baud_rate, "opening camera serial channel");

        let stream = tokio_serial::new(path, config.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| Error::Transport(format!("cannot open {path}: {e}")))?;

        if config.clear_input {
            if let Err(e) = stream.clear(ClearBuffer::Input) {
                warn!(path, error = %e, "could not discard stale input");
            }
        }

        info!(path, baud_rate = config.baud_rate, "camera serial channel open");
        Ok(SerialTransport {
            stream: Some(stream),
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        trace!(path = %self.path, tx = ?data);
        stream.write_all(data).await.map_err(map_io_error)?;
        stream.flush().await.map_err(map_io_error)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(map_io_error)?;
        if n == 0 {
            warn!(path = %self.path, "serial channel closed by the other end");
            return Err(Error::ConnectionLost);
        }
        trace!(path = %self.path, rx = ?&buf[..n]);
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            // Best effort; the port is released when the stream drops.
            let _ = stream.flush().await;
            info!(path = %self.path, "camera serial channel closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_state() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 57_600);
        assert!(config.clear_input);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unsupported_baud_rate_rejected() {
        let config = SerialConfig {
            baud_rate: 115_200,
            ..SerialConfig::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn closed_pipe_is_connection_lost() {
        let e = std::io::Error::from(ErrorKind::BrokenPipe);
        assert!(matches!(map_io_error(e), Error::ConnectionLost));
        let e = std::io::Error::from(ErrorKind::PermissionDenied);
        assert!(matches!(map_io_error(e), Error::Io(_)));
    }

    #[tokio::test]
    async fn open_missing_port_is_transport_error() {
        let result = SerialTransport::open("/dev/taulib-no-such-port", 57_600).await;
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[tokio::test]
    async fn open_rejects_bad_baud_before_touching_the_port() {
        let result = SerialTransport::open("/dev/taulib-no-such-port", 9_600).await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}
