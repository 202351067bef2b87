//! # taulib -- WIC thermal camera control
//!
//! `taulib` is an asynchronous Rust library for controlling WIC thermal
//! cameras built around a FLIR Tau-class core. It speaks the core's binary
//! serial protocol through the camera's serial bridge and converts raw
//! sensor counts to scene temperatures.
//!
//! ## Quick Start
//!
//! ```no_run
//! use taulib::wic::{CameraIdentity, WicBuilder};
//! use taulib::{CameraSpeed, Resolution};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let identity = CameraIdentity::new(
//!         "Workswell", "WIC 640", "WIC-640-30", CameraSpeed::Hz30, Resolution::R640,
//!     );
//!     let table = std::fs::read_to_string("calibration.txt")?.parse()?;
//!
//!     let camera = WicBuilder::new(identity, table)
//!         .serial_port("/dev/ttyUSB0")
//!         .build()
//!         .await?;
//!
//!     camera.set_default().await?;
//!     camera.set_emissivity(0.95)?;
//!     println!("8192 counts = {:.2} °C", camera.raw_to_temp(8192));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                 | Purpose                                          |
//! |-----------------------|--------------------------------------------------|
//! | `taulib-core`         | [`Transport`] trait, [`Error`], setting types    |
//! | `taulib-transport`    | Serial transport                                 |
//! | `taulib-wic`          | Protocol, calibration, lens switching, camera    |
//! | **`taulib`**          | This facade crate -- re-exports everything       |
//!
//! ## Lens switching
//!
//! Changing the lens calibration or range mode is a long-running device
//! operation. [`WicCamera::set_lens`](wic::WicCamera::set_lens) returns as soon
//! as the switch has started; every protocol call fails with
//! [`Error::DeviceBusy`] until it finishes:
//!
//! ```no_run
//! # async fn example(camera: &taulib::wic::WicCamera) -> taulib::Result<()> {
//! camera.set_lens("035mm")?;
//! while !camera.is_set_lens_ready()? {
//!     tokio::time::sleep(std::time::Duration::from_millis(500)).await;
//! }
//! # Ok(())
//! # }
//! ```

pub use taulib_core::*;

/// WIC camera backend.
///
/// Provides [`WicCamera`](wic::WicCamera) and [`WicBuilder`](wic::WicBuilder),
/// plus the frame codec, parameter registry and calibration engine they are
/// built on.
pub mod wic {
    pub use taulib_wic::*;
}

/// Transport implementations.
pub mod transport {
    pub use taulib_transport::*;
}
