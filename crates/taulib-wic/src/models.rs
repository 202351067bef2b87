//! Camera identity supplied by the device metadata collaborator.
//!
//! The serial protocol cannot report which WIC product a core sits in, so
//! manufacturer, model, WIC part number, frame rate and resolution are
//! handed to [`WicBuilder`](crate::builder::WicBuilder) at construction.

use taulib_core::{CameraSpeed, Resolution};

/// Static description of one WIC camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraIdentity {
    pub manufacturer: String,
    pub model: String,
    /// WIC device part number (not the core's own part number).
    pub part_number: String,
    pub speed: CameraSpeed,
    pub resolution: Resolution,
}

impl CameraIdentity {
    pub fn new(
        manufacturer: &str,
        model: &str,
        part_number: &str,
        speed: CameraSpeed,
        resolution: Resolution,
    ) -> Self {
        CameraIdentity {
            manufacturer: manufacturer.to_string(),
            model: model.to_string(),
            part_number: part_number.to_string(),
            speed,
            resolution,
        }
    }

    /// Build an identity whose resolution is taken from the core's part
    /// number, e.g. `46640013H` for a 640×512 core.
    ///
    /// Returns `None` when the part number does not name a known sensor.
    pub fn from_core_part_number(
        manufacturer: &str,
        model: &str,
        part_number: &str,
        speed: CameraSpeed,
        core_part_number: &str,
    ) -> Option<Self> {
        let resolution = Resolution::from_part_number(core_part_number)?;
        Some(Self::new(manufacturer, model, part_number, speed, resolution))
    }

    pub fn width(&self) -> u32 {
        self.resolution.dimensions().0
    }

    pub fn height(&self) -> u32 {
        self.resolution.dimensions().1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_from_core_part() {
        let id = CameraIdentity::from_core_part_number(
            "Workswell",
            "WIC 336",
            "WIC-336-30",
            CameraSpeed::Hz30,
            "46336013A",
        )
        .unwrap();
        assert_eq!(id.resolution, Resolution::R336);
        assert_eq!((id.width(), id.height()), (336, 256));
    }

    #[test]
    fn unknown_core_part_rejected() {
        assert!(
            CameraIdentity::from_core_part_number("x", "y", "z", CameraSpeed::Hz9, "46999013H")
                .is_none()
        );
    }
}
