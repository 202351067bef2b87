//! Asynchronous camera event types.
//!
//! Events are emitted through a [`tokio::sync::broadcast`] channel when a
//! lens or range switch changes state, so applications can update their UI
//! without polling `is_set_lens_ready()`.

use crate::types::RangeMode;

/// An event emitted by a camera driver.
///
/// Delivery is best effort through a bounded broadcast channel; slow
/// consumers may miss events.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    /// A lens or range switch was accepted and the camera is now busy.
    SwitchStarted {
        /// Target lens name.
        lens: String,
        /// Target range mode.
        range: RangeMode,
    },

    /// The camera confirmed the switch and the new calibration is active.
    SwitchCompleted { lens: String, range: RangeMode },

    /// The switch sequence failed, timed out, or was cancelled.
    SwitchFailed {
        lens: String,
        range: RangeMode,
        /// Human-readable failure reason.
        reason: String,
    },
}
