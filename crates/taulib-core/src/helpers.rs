//! Unit conversion helpers.

/// Offset between the Kelvin and Celsius scales.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Convert a temperature in degrees Celsius to kelvin.
///
/// ```
/// use taulib_core::celsius_to_kelvin;
///
/// assert!((celsius_to_kelvin(20.0) - 293.15).abs() < 1e-9);
/// ```
pub fn celsius_to_kelvin(celsius: f64) -> f64 {
    celsius + KELVIN_OFFSET
}

/// Convert a temperature in kelvin to degrees Celsius.
///
/// ```
/// use taulib_core::kelvin_to_celsius;
///
/// assert!((kelvin_to_celsius(273.15)).abs() < 1e-9);
/// ```
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_are_inverse() {
        for c in [-40.0, 0.0, 36.6, 1500.0] {
            assert!((kelvin_to_celsius(celsius_to_kelvin(c)) - c).abs() < 1e-9);
        }
    }
}
