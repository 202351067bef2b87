//! taulib-core: Core traits, types, and error definitions for taulib.
//!
//! This crate defines the transport abstraction, error type and setting
//! vocabulary shared by the camera protocol engine and its callers.
//! Applications can depend on these types without pulling in the serial
//! port stack.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`ResponseStatus`] -- status byte reported by the camera
//! - [`CameraEvent`] -- lens/range switch notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod helpers;
pub mod status;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::CameraEvent;
pub use helpers::{KELVIN_OFFSET, celsius_to_kelvin, kelvin_to_celsius};
pub use status::ResponseStatus;
pub use transport::Transport;
pub use types::*;
