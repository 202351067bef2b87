//! WIC thermal camera backend for taulib.
//!
//! This crate implements the binary serial protocol of the FLIR Tau-class
//! camera core inside a WIC camera, tunneled through the bridge's serial
//! port, plus the radiometric model that turns raw counts into
//! temperatures. It provides:
//!
//! - **Frame codec** ([`frame`]) -- encode command frames and validate reply
//!   frames, including both CRC-16 fields.
//! - **Parameter registry** ([`registry`]) -- descriptors for every camera
//!   setting: function code, encoding, direction, range and sub-selector.
//! - **Calibration engine** ([`calibration`]) -- raw/temperature conversion
//!   under emissivity, reflected and atmospheric temperature, humidity and
//!   distance, plus the per-device calibration table.
//! - **Lens switch** ([`lens`]) -- the state machine gating the camera while
//!   a lens or range calibration change runs.
//! - **WicCamera** ([`camera`]) -- the typed control surface.
//! - **WicBuilder** ([`builder`]) -- fluent builder with timeout, retry and
//!   initial-lens settings.
//!
//! # Example
//!
//! ```
//! use taulib_wic::frame::{FunctionCode, decode_frame, encode_frame};
//!
//! // FFC_MODE_SELECT query
//! let query = encode_frame(FunctionCode::FfcModeSelect, &[]).unwrap();
//! assert_eq!(query, vec![0x6E, 0x00, 0x00, 0x0B, 0x00, 0x00, 0x2F, 0x4A, 0x00, 0x00]);
//!
//! // The camera answers "automatic FFC".
//! let reply = [0x6E, 0x00, 0x00, 0x0B, 0x00, 0x02, 0x0F, 0x08, 0x00, 0x01, 0x10, 0x21];
//! let (frame, consumed) = decode_frame(&reply).unwrap();
//! assert!(frame.status.is_ok());
//! assert_eq!(frame.payload, vec![0x00, 0x01]);
//! assert_eq!(consumed, reply.len());
//! ```

pub mod builder;
pub mod calibration;
pub mod camera;
pub mod frame;
mod io;
pub mod lens;
pub mod models;
pub mod registry;

pub use builder::WicBuilder;
pub use calibration::{CalibrationEngine, CalibrationState, CalibrationTable, PlanckConstants};
pub use camera::WicCamera;
pub use lens::{SwitchOutcome, SwitchState, SwitchTarget};
pub use models::CameraIdentity;
