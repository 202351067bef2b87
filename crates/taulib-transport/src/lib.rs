//! Transport implementations for taulib.
//!
//! This crate provides [`SerialTransport`], the concrete implementation of
//! the [`Transport`](taulib_core::Transport) trait for the serial channel a
//! WIC/Pleora bridge exposes to its thermal camera core.
//!
//! # Example
//!
//! ```no_run
//! use taulib_transport::SerialTransport;
//! use taulib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> taulib_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 57_600).await?;
//!
//! // FFC_MODE_SELECT query
//! transport
//!     .send(&[0x6E, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x2F, 0x4A, 0x00, 0x00])
//!     .await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(300)).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;

pub use serial::{DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES, SerialConfig, SerialTransport};
