//! Radiometric calibration: raw sensor counts to scene temperature and back.
//!
//! Each lens/range combination has a sensor response curve described by five
//! Planck constants. The engine combines that curve with the scene inputs
//! (emissivity, reflected and atmospheric temperature, humidity, distance)
//! into two derived constants, a gain and an offset in raw counts:
//!
//! ```text
//! raw(T)   = R1 / (R2 * (exp(B / T) - F)) - O
//! gain     = 1 / (emissivity * tau)
//! offset   = (1 - emissivity) * tau * raw(T_refl) + (1 - tau) * raw(T_atm)
//! T(S)     = B / ln(R1 / (R2 * (gain * (S - offset) + O)) + F)
//! ```
//!
//! where `tau` is the atmospheric transmission over the object distance.
//! Derived constants are recomputed lazily: every setter drops them and the
//! next conversion rebuilds them, so a conversion never sees stale values.

use std::fmt;
use std::str::FromStr;

use taulib_core::{Error, RangeMode, Result, celsius_to_kelvin, kelvin_to_celsius};
use tracing::debug;

/// Smallest object signal fed to the inverse curve. Raw values at or below
/// the curve's floor convert to the coldest temperature it can express.
const MIN_OBJECT_SIGNAL: f64 = 1e-3;

// Atmospheric transmission model coefficients.
const ATM_X: f64 = 1.9;
const ATM_ALPHA1: f64 = 0.006569;
const ATM_ALPHA2: f64 = 0.01262;
const ATM_BETA1: f64 = -0.002276;
const ATM_BETA2: f64 = -0.00667;
const H2O_K0: f64 = 1.5587;
const H2O_K1: f64 = 0.06939;
const H2O_K2: f64 = -0.00027816;
const H2O_K3: f64 = 0.00000068455;

/// Sensor response curve of one lens/range calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanckConstants {
    pub r1: f64,
    pub r2: f64,
    pub b: f64,
    pub f: f64,
    pub o: f64,
}

impl PlanckConstants {
    pub fn new(r1: f64, r2: f64, b: f64, f: f64, o: f64) -> Result<Self> {
        let all_finite = [r1, r2, b, f, o].iter().all(|v| v.is_finite());
        if !all_finite || r1 <= 0.0 || r2 <= 0.0 || b <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "Planck constants must be finite with positive R1, R2, B: \
                 R1={r1} R2={r2} B={b} F={f} O={o}"
            )));
        }
        Ok(PlanckConstants { r1, r2, b, f, o })
    }

    /// Raw counts a blackbody at `kelvin` produces.
    pub fn raw_at(&self, kelvin: f64) -> f64 {
        self.r1 / (self.r2 * ((self.b / kelvin).exp() - self.f)) - self.o
    }

    /// Blackbody temperature producing `raw` counts.
    pub fn kelvin_at(&self, raw: f64) -> f64 {
        let signal = (raw + self.o).max(MIN_OBJECT_SIGNAL);
        self.b / (self.r1 / (self.r2 * signal) + self.f).ln()
    }
}

/// Fraction of radiation that survives `distance_m` of air at the given
/// relative humidity (0..=1) and temperature.
pub fn atmospheric_transmission(distance_m: f64, humidity: f64, atmospheric_k: f64) -> f64 {
    let t = kelvin_to_celsius(atmospheric_k);
    let h2o = humidity * (H2O_K0 + H2O_K1 * t + H2O_K2 * t * t + H2O_K3 * t * t * t).exp();
    let root_d = distance_m.sqrt();
    let root_h2o = h2o.sqrt();
    ATM_X * (-root_d * (ATM_ALPHA1 + ATM_BETA1 * root_h2o)).exp()
        + (1.0 - ATM_X) * (-root_d * (ATM_ALPHA2 + ATM_BETA2 * root_h2o)).exp()
}

/// Scene inputs to the conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationState {
    pub emissivity: f64,
    pub reflected_k: f64,
    pub atmospheric_k: f64,
    /// Relative humidity, 0..=1.
    pub humidity: f64,
    pub distance_m: f64,
    pub range: RangeMode,
}

impl Default for CalibrationState {
    fn default() -> Self {
        CalibrationState {
            emissivity: 1.0,
            reflected_k: celsius_to_kelvin(20.0),
            atmospheric_k: celsius_to_kelvin(20.0),
            humidity: 0.5,
            distance_m: 1.0,
            range: RangeMode::Low,
        }
    }
}

/// Conversion coefficients derived from a [`CalibrationState`] and curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConstants {
    pub gain: f64,
    /// Raw counts contributed by reflections and the atmosphere.
    pub offset: f64,
    pub transmission: f64,
}

/// Raw/temperature converter for one camera.
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    state: CalibrationState,
    curve: PlanckConstants,
    /// `None` whenever an input changed since the last recompute.
    derived: Option<DerivedConstants>,
}

impl CalibrationEngine {
    pub fn new(curve: PlanckConstants, range: RangeMode) -> Self {
        CalibrationEngine {
            state: CalibrationState {
                range,
                ..CalibrationState::default()
            },
            curve,
            derived: None,
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn curve(&self) -> &PlanckConstants {
        &self.curve
    }

    pub fn is_stale(&self) -> bool {
        self.derived.is_none()
    }

    pub fn set_emissivity(&mut self, emissivity: f64) -> Result<()> {
        if !(0.5..=1.0).contains(&emissivity) {
            return Err(Error::InvalidParameter(format!(
                "emissivity {emissivity} outside 0.5..=1.0"
            )));
        }
        self.state.emissivity = emissivity;
        self.derived = None;
        Ok(())
    }

    pub fn set_reflected_temperature(&mut self, kelvin: f64) -> Result<()> {
        self.state.reflected_k = check_kelvin("reflected temperature", kelvin)?;
        self.derived = None;
        Ok(())
    }

    pub fn set_atmospheric_temperature(&mut self, kelvin: f64) -> Result<()> {
        self.state.atmospheric_k = check_kelvin("atmospheric temperature", kelvin)?;
        self.derived = None;
        Ok(())
    }

    pub fn set_humidity(&mut self, humidity: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&humidity) {
            return Err(Error::InvalidParameter(format!(
                "humidity {humidity} outside 0..=1"
            )));
        }
        self.state.humidity = humidity;
        self.derived = None;
        Ok(())
    }

    pub fn set_distance(&mut self, distance_m: f64) -> Result<()> {
        if !distance_m.is_finite() || distance_m < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "distance {distance_m} m must be finite and non-negative"
            )));
        }
        self.state.distance_m = distance_m;
        self.derived = None;
        Ok(())
    }

    /// Adopt the curve of a newly activated lens/range calibration.
    ///
    /// Only call this once the camera has confirmed the switch.
    pub fn set_calibration(&mut self, range: RangeMode, curve: PlanckConstants) {
        self.state.range = range;
        self.curve = curve;
        self.derived = None;
    }

    /// Return the derived constants, recomputing them if any input changed.
    pub fn recalculate_constants(&mut self) -> DerivedConstants {
        if let Some(derived) = self.derived {
            return derived;
        }
        let s = &self.state;
        let tau = atmospheric_transmission(s.distance_m, s.humidity, s.atmospheric_k);
        let derived = DerivedConstants {
            gain: 1.0 / (s.emissivity * tau),
            offset: (1.0 - s.emissivity) * tau * self.curve.raw_at(s.reflected_k)
                + (1.0 - tau) * self.curve.raw_at(s.atmospheric_k),
            transmission: tau,
        };
        debug!(
            range = %s.range,
            gain = derived.gain,
            offset = derived.offset,
            tau,
            "recalculated calibration constants"
        );
        self.derived = Some(derived);
        derived
    }

    /// Convert raw counts to scene temperature in °C.
    pub fn raw_to_temp(&mut self, raw: u16) -> f64 {
        let k = self.recalculate_constants();
        let object = k.gain * (raw as f64 - k.offset);
        kelvin_to_celsius(self.curve.kelvin_at(object))
    }

    /// Convert a scene temperature in °C to the raw counts it would produce.
    ///
    /// Results outside the 16-bit range are clamped.
    pub fn temp_to_raw(&mut self, celsius: f64) -> u16 {
        let kelvin = celsius_to_kelvin(celsius);
        if !kelvin.is_finite() || kelvin <= 0.0 {
            return 0;
        }
        let k = self.recalculate_constants();
        let raw = self.curve.raw_at(kelvin) / k.gain + k.offset;
        if raw.is_nan() {
            return 0;
        }
        raw.round().clamp(0.0, u16::MAX as f64) as u16
    }

    /// Convert a whole raw frame to °C under one set of constants.
    pub fn raw_frame_to_temps(&mut self, raw: &[u16]) -> Vec<f64> {
        let k = self.recalculate_constants();
        raw.iter()
            .map(|&r| kelvin_to_celsius(self.curve.kelvin_at(k.gain * (r as f64 - k.offset))))
            .collect()
    }
}

fn check_kelvin(what: &str, kelvin: f64) -> Result<f64> {
    if kelvin.is_finite() && kelvin > 0.0 {
        Ok(kelvin)
    } else {
        Err(Error::InvalidParameter(format!(
            "{what} {kelvin} K must be above absolute zero"
        )))
    }
}

// ---------------------------------------------------------------
// Calibration table
// ---------------------------------------------------------------

/// Device calibration for one range of one lens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeCalibration {
    /// Calibration bank the camera selects for this lens/range.
    pub bank: u16,
    pub curve: PlanckConstants,
}

/// All range calibrations available for one lens.
#[derive(Debug, Clone, PartialEq)]
pub struct LensCalibration {
    name: String,
    ranges: [Option<RangeCalibration>; 3],
}

impl LensCalibration {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn range(&self, range: RangeMode) -> Option<&RangeCalibration> {
        self.ranges[range.index()].as_ref()
    }

    pub fn supports_high_range(&self) -> bool {
        self.ranges[RangeMode::High.index()].is_some()
    }

    /// Ranges this lens is calibrated for, in Low/Middle/High order.
    pub fn ranges(&self) -> Vec<RangeMode> {
        RangeMode::ALL
            .iter()
            .copied()
            .filter(|r| self.range(*r).is_some())
            .collect()
    }
}

/// Per-device lens list and calibration data, supplied at construction.
///
/// The text form has one range entry per line; `#` starts a comment:
///
/// ```text
/// # lens  range   bank  R1      R2  B     F  O
/// 019mm   low     0     300000  1   1430  1  -1500
/// 019mm   middle  1     40000   1   1000  1  -300
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationTable {
    lenses: Vec<LensCalibration>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the calibration of `lens` for `range`.
    pub fn insert(&mut self, lens: &str, range: RangeMode, calibration: RangeCalibration) {
        let index = match self.lenses.iter().position(|l| l.name == lens) {
            Some(i) => i,
            None => {
                self.lenses.push(LensCalibration {
                    name: lens.to_string(),
                    ranges: [None; 3],
                });
                self.lenses.len() - 1
            }
        };
        self.lenses[index].ranges[range.index()] = Some(calibration);
    }

    pub fn lens(&self, name: &str) -> Option<&LensCalibration> {
        self.lenses.iter().find(|l| l.name == name)
    }

    pub fn lenses(&self) -> &[LensCalibration] {
        &self.lenses
    }

    pub fn lens_names(&self) -> Vec<String> {
        self.lenses.iter().map(|l| l.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lenses.is_empty()
    }
}

/// Error returned when calibration table text cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("calibration table line {line}: {message}")]
pub struct ParseCalibrationError {
    pub line: usize,
    pub message: String,
}

impl FromStr for CalibrationTable {
    type Err = ParseCalibrationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut table = CalibrationTable::new();
        for (i, raw_line) in s.lines().enumerate() {
            let line = i + 1;
            let content = raw_line.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let err = |message: String| ParseCalibrationError { line, message };

            let fields: Vec<&str> = content.split_whitespace().collect();
            if fields.len() != 8 {
                return Err(err(format!("expected 8 fields, found {}", fields.len())));
            }
            let range: RangeMode = fields[1].parse().map_err(|e| err(format!("{e}")))?;
            let bank: u16 = fields[2]
                .parse()
                .map_err(|_| err(format!("invalid bank {:?}", fields[2])))?;
            let mut values = [0.0f64; 5];
            for (slot, field) in values.iter_mut().zip(&fields[3..]) {
                *slot = field
                    .parse()
                    .map_err(|_| err(format!("invalid number {field:?}")))?;
            }
            let [r1, r2, b, f, o] = values;
            let curve = PlanckConstants::new(r1, r2, b, f, o).map_err(|e| err(e.to_string()))?;
            table.insert(fields[0], range, RangeCalibration { bank, curve });
        }
        Ok(table)
    }
}

impl fmt::Display for CalibrationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for lens in &self.lenses {
            for range in lens.ranges() {
                if let Some(cal) = lens.range(range) {
                    let c = &cal.curve;
                    writeln!(
                        f,
                        "{} {} {} {} {} {} {} {}",
                        lens.name, range, cal.bank, c.r1, c.r2, c.b, c.f, c.o
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn low_curve() -> PlanckConstants {
        PlanckConstants::new(300_000.0, 1.0, 1_430.0, 1.0, -1_500.0).unwrap()
    }

    fn scenario_engine() -> CalibrationEngine {
        let mut engine = CalibrationEngine::new(low_curve(), RangeMode::Low);
        engine.set_emissivity(0.95).unwrap();
        engine.set_reflected_temperature(293.15).unwrap();
        engine.set_atmospheric_temperature(293.15).unwrap();
        engine.set_humidity(0.5).unwrap();
        engine.set_distance(1.0).unwrap();
        engine
    }

    const TABLE: &str = "\
# lens  range   bank  R1      R2  B     F  O
019mm   low     0     300000  1   1430  1  -1500
019mm   middle  1     40000   1   1000  1  -300
019mm   high    2     70000   1   3000  1  -300   # high range lens

035mm   low     3     300000  1   1430  1  -1500
035mm   middle  4     40000   1   1000  1  -300
";

    // ---------------------------------------------------------------
    // Conversion
    // ---------------------------------------------------------------

    #[test]
    fn round_trip_within_one_count() {
        let mut engine = scenario_engine();
        for raw in [3_000u16, 8_192, 12_000, 16_000] {
            let celsius = engine.raw_to_temp(raw);
            let back = engine.temp_to_raw(celsius);
            assert!(
                (back as i32 - raw as i32).abs() <= 1,
                "raw {raw} -> {celsius} C -> {back}"
            );
        }
    }

    #[test]
    fn known_temperatures_for_scenario() {
        let mut engine = scenario_engine();
        assert!((engine.raw_to_temp(8_192) - 104.38).abs() < 0.05);
        assert!((engine.raw_to_temp(12_000) - 154.57).abs() < 0.05);
        assert!((engine.raw_to_temp(16_000) - 198.70).abs() < 0.05);
    }

    #[test]
    fn conversion_is_monotonic() {
        let mut engine = scenario_engine();
        let mut previous = f64::NEG_INFINITY;
        for raw in (2_000u16..=16_000).step_by(500) {
            let t = engine.raw_to_temp(raw);
            assert!(t > previous);
            previous = t;
        }
    }

    #[test]
    fn below_curve_floor_is_clamped_not_nan() {
        let mut engine = scenario_engine();
        let t = engine.raw_to_temp(0);
        assert!(t.is_finite());
        assert!(t < -150.0);
    }

    #[test]
    fn temp_to_raw_clamps() {
        let mut engine = scenario_engine();
        assert_eq!(engine.temp_to_raw(5_000.0), u16::MAX);
        assert_eq!(engine.temp_to_raw(-300.0), 0);
    }

    #[test]
    fn frame_conversion_matches_single() {
        let mut engine = scenario_engine();
        let frame = [3_000u16, 8_192, 16_000];
        let temps = engine.raw_frame_to_temps(&frame);
        for (raw, t) in frame.iter().zip(&temps) {
            assert!((engine.raw_to_temp(*raw) - t).abs() < 1e-9);
        }
    }

    // ---------------------------------------------------------------
    // Derived constants
    // ---------------------------------------------------------------

    #[test]
    fn setters_invalidate_constants() {
        let mut engine = scenario_engine();
        let before = engine.recalculate_constants();
        assert!(!engine.is_stale());

        engine.set_emissivity(0.8).unwrap();
        assert!(engine.is_stale());
        let after = engine.recalculate_constants();
        assert!(after.gain > before.gain);
    }

    #[test]
    fn lower_emissivity_reads_hotter() {
        let mut engine = scenario_engine();
        let at_095 = engine.raw_to_temp(8_192);
        engine.set_emissivity(0.7).unwrap();
        assert!(engine.raw_to_temp(8_192) > at_095);
    }

    #[test]
    fn transmission_model() {
        assert!((atmospheric_transmission(0.0, 0.5, 293.15) - 1.0).abs() < 1e-12);
        let near = atmospheric_transmission(1.0, 0.5, 293.15);
        let far = atmospheric_transmission(100.0, 0.5, 293.15);
        assert!((near - 0.99394).abs() < 1e-4);
        assert!(far < near);
    }

    #[test]
    fn range_change_swaps_curve() {
        let mut engine = scenario_engine();
        let low = engine.raw_to_temp(8_192);
        let high = PlanckConstants::new(70_000.0, 1.0, 3_000.0, 1.0, -300.0).unwrap();
        engine.set_calibration(RangeMode::High, high);
        assert_eq!(engine.state().range, RangeMode::High);
        assert!(engine.raw_to_temp(8_192) > low + 500.0);
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    #[test]
    fn rejects_out_of_range_inputs() {
        let mut engine = scenario_engine();
        assert!(engine.set_emissivity(0.49).is_err());
        assert!(engine.set_emissivity(1.01).is_err());
        assert!(engine.set_humidity(1.5).is_err());
        assert!(engine.set_distance(-1.0).is_err());
        assert!(engine.set_reflected_temperature(0.0).is_err());
        assert!(engine.set_atmospheric_temperature(f64::NAN).is_err());
        // Rejected values leave the state untouched.
        assert_eq!(engine.state().emissivity, 0.95);
    }

    #[test]
    fn planck_constants_validated() {
        assert!(PlanckConstants::new(0.0, 1.0, 1.0, 1.0, 0.0).is_err());
        assert!(PlanckConstants::new(1.0, 1.0, f64::INFINITY, 1.0, 0.0).is_err());
    }

    // ---------------------------------------------------------------
    // Table parsing
    // ---------------------------------------------------------------

    #[test]
    fn parse_table() {
        let table: CalibrationTable = TABLE.parse().unwrap();
        assert_eq!(table.lens_names(), vec!["019mm", "035mm"]);

        let lens = table.lens("019mm").unwrap();
        assert!(lens.supports_high_range());
        assert_eq!(lens.range(RangeMode::Middle).unwrap().bank, 1);
        assert_eq!(lens.ranges().len(), 3);

        let lens = table.lens("035mm").unwrap();
        assert!(!lens.supports_high_range());
        assert_eq!(lens.range(RangeMode::Low).unwrap().curve, low_curve());
    }

    #[test]
    fn parse_errors_name_the_line() {
        let err = "019mm low 0 300000 1 1430 1".parse::<CalibrationTable>().unwrap_err();
        assert_eq!(err.line, 1);

        let err = "\n019mm ultra 0 1 1 1 1 1".parse::<CalibrationTable>().unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("range mode"));
    }

    #[test]
    fn display_round_trips() {
        let table: CalibrationTable = TABLE.parse().unwrap();
        let reparsed: CalibrationTable = table.to_string().parse().unwrap();
        assert_eq!(reparsed, table);
    }
}
