//! WicBuilder -- fluent builder for constructing [`WicCamera`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! the serial port, timeouts, retry policy and the initial lens before the
//! session starts.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use taulib_core::{CameraSpeed, Resolution};
//! use taulib_wic::{CameraIdentity, WicBuilder};
//!
//! # async fn example() -> taulib_core::Result<()> {
//! let identity = CameraIdentity::new(
//!     "Workswell", "WIC 640", "WIC-640-30", CameraSpeed::Hz30, Resolution::R640,
//! );
//! let table = "019mm low 0 300000 1 1430 1 -1500".parse().unwrap();
//! let camera = WicBuilder::new(identity, table)
//!     .serial_port("/dev/ttyUSB0")
//!     .command_timeout(Duration::from_millis(300))
//!     .build()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use taulib_core::error::{Error, Result};
use taulib_core::transport::Transport;
use taulib_core::RangeMode;
use tracing::debug;

use crate::calibration::CalibrationTable;
use crate::camera::{CameraConfig, WicCamera};
use crate::io::{self, IoConfig};
use crate::lens::{LensSwitch, SwitchTarget};
use crate::models::CameraIdentity;

/// Fluent builder for [`WicCamera`].
pub struct WicBuilder {
    identity: CameraIdentity,
    table: CalibrationTable,
    serial_port: Option<String>,
    baud_rate: u32,
    command_timeout: Duration,
    retry_reads: bool,
    checksum_retries: u32,
    lens: Option<String>,
    lens_switch_timeout: Duration,
    lens_poll_interval: Duration,
}

impl WicBuilder {
    /// Create a builder for a camera with the given identity and
    /// per-device calibration table.
    pub fn new(identity: CameraIdentity, table: CalibrationTable) -> Self {
        WicBuilder {
            identity,
            table,
            serial_port: None,
            baud_rate: taulib_transport::DEFAULT_BAUD_RATE,
            command_timeout: Duration::from_millis(300),
            retry_reads: true,
            checksum_retries: 1,
            lens: None,
            lens_switch_timeout: Duration::from_secs(180),
            lens_poll_interval: Duration::from_millis(500),
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 57600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Deadline for one command/response exchange (default: 300ms).
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Resend a read once when the camera did not answer it at all
    /// (default: true). Writes and actions are never resent after silence.
    pub fn retry_reads(mut self, enabled: bool) -> Self {
        self.retry_reads = enabled;
        self
    }

    /// Resends after a corrupt reply (default: 1). A command goes out at
    /// most twice whatever the cause, so values above 1 act as 1.
    pub fn checksum_retries(mut self, n: u32) -> Self {
        self.checksum_retries = n.min(1);
        self
    }

    /// Lens calibration active when the camera is opened (default: the
    /// first lens in the table).
    pub fn lens(mut self, name: &str) -> Self {
        self.lens = Some(name.to_string());
        self
    }

    /// Upper bound on a whole lens/range switch (default: 180s).
    pub fn lens_switch_timeout(mut self, timeout: Duration) -> Self {
        self.lens_switch_timeout = timeout;
        self
    }

    /// Interval between readiness polls during a switch (default: 500ms).
    pub fn lens_poll_interval(mut self, interval: Duration) -> Self {
        self.lens_poll_interval = interval;
        self
    }

    /// Build a [`WicCamera`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `taulib-test-harness`) and for callers that manage the transport
    /// themselves, such as a vendor serial bridge.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<WicCamera> {
        let lens = match &self.lens {
            Some(name) => self
                .table
                .lens(name)
                .ok_or_else(|| Error::InvalidParameter(format!("unknown lens {name:?}")))?,
            None => self.table.lenses().first().ok_or_else(|| {
                Error::InvalidParameter("calibration table has no lenses".into())
            })?,
        };
        let range = if lens.range(RangeMode::Low).is_some() {
            RangeMode::Low
        } else {
            lens.ranges().first().copied().ok_or_else(|| {
                Error::InvalidParameter(format!("lens {:?} has no calibrated range", lens.name()))
            })?
        };
        let calibration = *lens.range(range).ok_or_else(|| {
            Error::InvalidParameter(format!("lens {:?} has no {range} range", lens.name()))
        })?;
        let initial = SwitchTarget {
            lens: lens.name().to_string(),
            range,
        };
        debug!(
            model = %self.identity.model,
            lens = %initial,
            timeout_ms = self.command_timeout.as_millis(),
            "starting camera session"
        );

        let gate = Arc::new(LensSwitch::new());
        let session = io::spawn_io_task(
            transport,
            IoConfig {
                command_timeout: self.command_timeout,
                checksum_retry: self.checksum_retries > 0,
                retry_reads: self.retry_reads,
            },
            gate.subscribe(),
        );

        Ok(WicCamera::new(
            session,
            gate,
            self.identity,
            self.table,
            initial,
            calibration,
            CameraConfig {
                lens_poll_interval: self.lens_poll_interval,
                lens_switch_timeout: self.lens_switch_timeout,
            },
        ))
    }

    /// Build a [`WicCamera`] using a serial transport.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<WicCamera> {
        let port = self
            .serial_port
            .as_ref()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = taulib_transport::SerialTransport::open(port, self.baud_rate).await?;
        self.build_with_transport(Box::new(transport)).await
    }
}
