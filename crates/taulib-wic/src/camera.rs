//! WicCamera -- the typed control surface of a WIC thermal camera.
//!
//! This module ties the parameter registry ([`registry`]) and the calibration
//! engine ([`calibration`](crate::calibration)) to the IO session that owns
//! the serial channel. Every getter and setter resolves its descriptor,
//! validates locally, queues one command and returns once the session
//! reports a terminal outcome. The session sends a command at most twice.
//!
//! While a lens or range switch is in progress every protocol method fails
//! with [`Error::DeviceBusy`] before touching the transport. Calibration
//! setters and conversions are local and stay available.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use taulib_core::*;

use crate::calibration::{CalibrationEngine, CalibrationState, CalibrationTable, RangeCalibration};
use crate::io::SessionIo;
use crate::lens::{self, LensSwitch, SwitchContext, SwitchState, SwitchTarget};
use crate::models::CameraIdentity;
use crate::registry::{self, *};

/// Fixed-point scale of emissivity and window transmission on the wire.
const UNITY_SCALE: f64 = 8192.0;

/// Runtime options handed over by the builder.
#[derive(Debug, Clone)]
pub(crate) struct CameraConfig {
    pub lens_poll_interval: Duration,
    pub lens_switch_timeout: Duration,
}

/// A connected WIC camera controlled over its serial bridge.
///
/// Constructed via [`WicBuilder`](crate::builder::WicBuilder). The camera can
/// be shared between tasks behind an `Arc`; commands from concurrent callers
/// are queued by the session and never interleave on the wire.
pub struct WicCamera {
    io: SessionIo,
    identity: CameraIdentity,
    table: CalibrationTable,
    engine: Arc<Mutex<CalibrationEngine>>,
    gate: Arc<LensSwitch>,
    active: Arc<Mutex<SwitchTarget>>,
    event_tx: broadcast::Sender<CameraEvent>,
    config: CameraConfig,
    switch_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for WicCamera {
    fn drop(&mut self) {
        self.io.cancel.cancel();
        self.io.task.abort();
        if let Some(task) = lock(&self.switch_task).take() {
            task.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WicCamera {
    /// Called by [`WicBuilder`](crate::builder::WicBuilder); callers should
    /// use the builder API instead.
    pub(crate) fn new(
        io: SessionIo,
        gate: Arc<LensSwitch>,
        identity: CameraIdentity,
        table: CalibrationTable,
        initial: SwitchTarget,
        calibration: RangeCalibration,
        config: CameraConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        WicCamera {
            io,
            identity,
            table,
            engine: Arc::new(Mutex::new(CalibrationEngine::new(
                calibration.curve,
                initial.range,
            ))),
            gate,
            active: Arc::new(Mutex::new(initial)),
            event_tx,
            config,
            switch_task: Mutex::new(None),
        }
    }

    // ---------------------------------------------------------------
    // Command plumbing
    // ---------------------------------------------------------------

    async fn read(&self, param: &Parameter, selector: Option<Selector>) -> Result<Argument> {
        self.gate.ensure_not_busy()?;
        let frame = registry::build_get(param, selector)?;
        let reply = self.io.handle.read(frame).await?;
        registry::decode_value(param, selector, &reply.payload)
    }

    async fn read_int(&self, param: &Parameter, selector: Option<Selector>) -> Result<i32> {
        let arg = self.read(param, selector).await?;
        param.to_value(&arg)
    }

    async fn read_word<T: WireValue>(
        &self,
        param: &Parameter,
        selector: Option<Selector>,
    ) -> Result<T> {
        T::from_wire(self.read(param, selector).await?.word()?)
    }

    async fn read_bytes(&self, param: &Parameter) -> Result<Vec<u8>> {
        Ok(self.read(param, None).await?.bytes()?.to_vec())
    }

    async fn write(
        &self,
        param: &Parameter,
        selector: Option<Selector>,
        value: &Argument,
    ) -> Result<()> {
        self.gate.ensure_not_busy()?;
        let frame = registry::build_set(param, selector, value)?;
        self.io.handle.command(frame).await?;
        Ok(())
    }

    async fn write_int(&self, param: &Parameter, selector: Option<Selector>, value: i32) -> Result<()> {
        let arg = param.to_argument(value)?;
        self.write(param, selector, &arg).await
    }

    async fn write_word<T: WireValue>(
        &self,
        param: &Parameter,
        selector: Option<Selector>,
        value: T,
    ) -> Result<()> {
        self.write(param, selector, &value.to_argument()).await
    }

    async fn action(&self, param: &Parameter) -> Result<()> {
        self.gate.ensure_not_busy()?;
        debug!(action = param.name, "sending action");
        self.io.handle.command(registry::build_action(param)?).await?;
        Ok(())
    }

    fn engine(&self) -> MutexGuard<'_, CalibrationEngine> {
        lock(&self.engine)
    }

    // ---------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------

    pub fn identity(&self) -> &CameraIdentity {
        &self.identity
    }

    pub fn manufacturer(&self) -> &str {
        &self.identity.manufacturer
    }

    pub fn model(&self) -> &str {
        &self.identity.model
    }

    /// WIC device part number.
    pub fn part_number(&self) -> &str {
        &self.identity.part_number
    }

    pub fn speed(&self) -> CameraSpeed {
        self.identity.speed
    }

    pub fn resolution(&self) -> Resolution {
        self.identity.resolution
    }

    pub async fn serial_numbers(&self) -> Result<SerialNumbers> {
        registry::parse_serial_numbers(&self.read_bytes(&SERIAL_NUMBER).await?)
    }

    pub async fn camera_serial_number(&self) -> Result<u32> {
        Ok(self.serial_numbers().await?.camera)
    }

    pub async fn sensor_serial_number(&self) -> Result<u32> {
        Ok(self.serial_numbers().await?.sensor)
    }

    /// Software and firmware versions of the camera core.
    pub async fn revision(&self) -> Result<Revision> {
        registry::parse_revision(&self.read_bytes(&REVISION).await?)
    }

    /// Part number reported by the camera core itself.
    pub async fn camera_part_number(&self) -> Result<String> {
        Ok(registry::parse_part_number(&self.read_bytes(&CAMERA_PART).await?))
    }

    /// Whether the attached core reports a part number for a known sensor.
    pub async fn is_supported(&self) -> Result<bool> {
        let part = self.camera_part_number().await?;
        let supported = Resolution::from_part_number(&part).is_some();
        debug!(%part, supported, "checked camera part number");
        Ok(supported)
    }

    // ---------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------

    /// Round trip a NO_OP to check the camera answers.
    pub async fn no_op(&self) -> Result<()> {
        self.action(&NO_OP).await
    }

    /// Run a flat field correction.
    pub async fn do_ffc(&self) -> Result<()> {
        self.action(&DO_FFC).await
    }

    /// Restore the core's power-on settings (not the WIC defaults).
    pub async fn do_set_defaults(&self) -> Result<()> {
        self.action(&SET_DEFAULTS).await
    }

    /// Reset the camera core. Communication drops until it has rebooted.
    pub async fn camera_reset(&self) -> Result<()> {
        self.action(&CAMERA_RESET).await
    }

    pub async fn restore_factory_defaults(&self) -> Result<()> {
        self.action(&RESTORE_FACTORY_DEFAULTS).await
    }

    /// Put the camera into the WIC measurement setup: 14-bit raw data on the
    /// CMOS bus, no test pattern, and radiometry on for radiometric cores.
    pub async fn set_default(&self) -> Result<()> {
        self.set_xp_bus_mode(XpBusMode::Cmos).await?;
        self.set_cmos_bit_depth(DigitalOutputDepth::Bits14).await?;
        self.set_test_pattern(TestPattern::Off).await?;
        if self.is_radiometric().await? {
            self.set_radiometry_mode(true).await?;
        }
        debug!("WIC defaults applied");
        Ok(())
    }

    // ---------------------------------------------------------------
    // FFC
    // ---------------------------------------------------------------

    pub async fn ffc_mode(&self) -> Result<FfcMode> {
        self.read_word(&FFC_MODE, None).await
    }

    pub async fn set_ffc_mode(&self, mode: FfcMode) -> Result<()> {
        self.write_word(&FFC_MODE, None, mode).await
    }

    /// Frames between automatic FFCs, 0..=30000 (0 disables).
    pub async fn ffc_period(&self) -> Result<i32> {
        self.read_int(&FFC_PERIOD, None).await
    }

    pub async fn set_ffc_period(&self, frames: i32) -> Result<()> {
        self.write_int(&FFC_PERIOD, None, frames).await
    }

    /// Temperature change that triggers an automatic FFC, 0..=1000.
    pub async fn ffc_temp_delta(&self) -> Result<i32> {
        self.read_int(&FFC_TEMP_DELTA, None).await
    }

    pub async fn set_ffc_temp_delta(&self, delta: i32) -> Result<()> {
        self.write_int(&FFC_TEMP_DELTA, None, delta).await
    }

    /// Frames of warning before an automatic FFC, 0..=600.
    pub async fn ffc_warn_time(&self) -> Result<i32> {
        self.read_int(&FFC_WARN_TIME, None).await
    }

    pub async fn set_ffc_warn_time(&self, frames: i32) -> Result<()> {
        self.write_int(&FFC_WARN_TIME, None, frames).await
    }

    // ---------------------------------------------------------------
    // Video
    // ---------------------------------------------------------------

    pub async fn analog_video(&self) -> Result<bool> {
        let word = self.read(&VIDEO_MODE, None).await?.word()?;
        Ok(word & VIDEO_MODE_ANALOG_OFF == 0)
    }

    pub async fn set_analog_video(&self, on: bool) -> Result<()> {
        let word = if on { 0 } else { VIDEO_MODE_ANALOG_OFF };
        self.write_int(&VIDEO_MODE, None, word as i32).await
    }

    async fn orientation(&self) -> Result<u16> {
        self.read(&VIDEO_ORIENTATION, None).await?.word()
    }

    async fn set_orientation_bit(&self, bit: u16, on: bool) -> Result<()> {
        let current = self.orientation().await?;
        let updated = if on { current | bit } else { current & !bit };
        self.write_int(&VIDEO_ORIENTATION, None, updated as i32).await
    }

    /// Whether the image is flipped vertically.
    pub async fn invert(&self) -> Result<bool> {
        Ok(self.orientation().await? & ORIENTATION_INVERT != 0)
    }

    pub async fn set_invert(&self, on: bool) -> Result<()> {
        self.set_orientation_bit(ORIENTATION_INVERT, on).await
    }

    /// Whether the image is mirrored horizontally.
    pub async fn revert(&self) -> Result<bool> {
        Ok(self.orientation().await? & ORIENTATION_REVERT != 0)
    }

    pub async fn set_revert(&self, on: bool) -> Result<()> {
        self.set_orientation_bit(ORIENTATION_REVERT, on).await
    }

    pub async fn palette(&self) -> Result<Palette> {
        self.read_word(&VIDEO_PALETTE, None).await
    }

    pub async fn set_palette(&self, palette: Palette) -> Result<()> {
        self.write_word(&VIDEO_PALETTE, None, palette).await
    }

    pub async fn video_color_mode(&self) -> Result<VideoColorMode> {
        self.read_word(&VIDEO_COLOR_MODE, None).await
    }

    pub async fn set_video_color_mode(&self, mode: VideoColorMode) -> Result<()> {
        self.write_word(&VIDEO_COLOR_MODE, None, mode).await
    }

    pub async fn video_standard(&self) -> Result<VideoStandard> {
        self.read_word(&VIDEO_STANDARD, None).await
    }

    pub async fn set_video_standard(&self, standard: VideoStandard) -> Result<()> {
        self.write_word(&VIDEO_STANDARD, None, standard).await
    }

    pub async fn test_pattern(&self) -> Result<TestPattern> {
        self.read_word(&TEST_PATTERN, None).await
    }

    pub async fn set_test_pattern(&self, pattern: TestPattern) -> Result<()> {
        self.write_word(&TEST_PATTERN, None, pattern).await
    }

    pub async fn external_sync(&self) -> Result<ExternalSyncMode> {
        self.read_word(&EXTERNAL_SYNC, None).await
    }

    pub async fn set_external_sync(&self, mode: ExternalSyncMode) -> Result<()> {
        self.write_word(&EXTERNAL_SYNC, None, mode).await
    }

    // ---------------------------------------------------------------
    // Digital output
    // ---------------------------------------------------------------

    const XP_MODE: Option<Selector> = Some(Selector::DigitalOutput(DigitalOutput::XpMode));
    const LVDS_MODE: Option<Selector> = Some(Selector::DigitalOutput(DigitalOutput::LvdsMode));
    const CMOS_DEPTH: Option<Selector> = Some(Selector::DigitalOutput(DigitalOutput::CmosBitDepth));
    const LVDS_DEPTH: Option<Selector> = Some(Selector::DigitalOutput(DigitalOutput::LvdsBitDepth));

    pub async fn xp_bus_mode(&self) -> Result<XpBusMode> {
        self.read_word(&DIGITAL_OUTPUT, Self::XP_MODE).await
    }

    pub async fn set_xp_bus_mode(&self, mode: XpBusMode) -> Result<()> {
        self.write_word(&DIGITAL_OUTPUT, Self::XP_MODE, mode).await
    }

    pub async fn lvds_mode(&self) -> Result<LvdsMode> {
        self.read_word(&DIGITAL_OUTPUT, Self::LVDS_MODE).await
    }

    pub async fn set_lvds_mode(&self, mode: LvdsMode) -> Result<()> {
        self.write_word(&DIGITAL_OUTPUT, Self::LVDS_MODE, mode).await
    }

    pub async fn cmos_bit_depth(&self) -> Result<DigitalOutputDepth> {
        self.read_word(&DIGITAL_OUTPUT, Self::CMOS_DEPTH).await
    }

    pub async fn set_cmos_bit_depth(&self, depth: DigitalOutputDepth) -> Result<()> {
        self.write_word(&DIGITAL_OUTPUT, Self::CMOS_DEPTH, depth).await
    }

    pub async fn lvds_bit_depth(&self) -> Result<DigitalOutputDepth> {
        self.read_word(&DIGITAL_OUTPUT, Self::LVDS_DEPTH).await
    }

    pub async fn set_lvds_bit_depth(&self, depth: DigitalOutputDepth) -> Result<()> {
        self.write_word(&DIGITAL_OUTPUT, Self::LVDS_DEPTH, depth).await
    }

    // ---------------------------------------------------------------
    // AGC and image processing
    // ---------------------------------------------------------------

    pub async fn agc_type(&self) -> Result<AgcType> {
        self.read_word(&AGC_TYPE, None).await
    }

    pub async fn set_agc_type(&self, agc: AgcType) -> Result<()> {
        self.write_word(&AGC_TYPE, None, agc).await
    }

    /// Contrast used by the once-bright, auto-bright and manual AGC, 0..=255.
    pub async fn contrast(&self) -> Result<i32> {
        self.read_int(&CONTRAST, None).await
    }

    pub async fn set_contrast(&self, contrast: i32) -> Result<()> {
        self.write_int(&CONTRAST, None, contrast).await
    }

    /// Brightness used by the manual and auto-bright AGC, 0..=16383.
    pub async fn brightness(&self) -> Result<i32> {
        self.read_int(&BRIGHTNESS, None).await
    }

    pub async fn set_brightness(&self, brightness: i32) -> Result<()> {
        self.write_int(&BRIGHTNESS, None, brightness).await
    }

    pub async fn brightness_bias(&self) -> Result<i32> {
        self.read_int(&BRIGHTNESS_BIAS, None).await
    }

    pub async fn set_brightness_bias(&self, bias: i32) -> Result<()> {
        self.write_int(&BRIGHTNESS_BIAS, None, bias).await
    }

    pub async fn agc_filter(&self) -> Result<i32> {
        self.read_int(&AGC_FILTER, None).await
    }

    pub async fn set_agc_filter(&self, filter: i32) -> Result<()> {
        self.write_int(&AGC_FILTER, None, filter).await
    }

    pub async fn plateau_level(&self) -> Result<i32> {
        self.read_int(&PLATEAU_LEVEL, None).await
    }

    pub async fn set_plateau_level(&self, level: i32) -> Result<()> {
        self.write_int(&PLATEAU_LEVEL, None, level).await
    }

    pub async fn agc_midpoint(&self) -> Result<i32> {
        self.read_int(&AGC_MIDPOINT, None).await
    }

    pub async fn set_agc_midpoint(&self, midpoint: i32) -> Result<()> {
        self.write_int(&AGC_MIDPOINT, None, midpoint).await
    }

    pub async fn max_agc_gain(&self) -> Result<i32> {
        self.read_int(&MAX_AGC_GAIN, None).await
    }

    pub async fn set_max_agc_gain(&self, gain: i32) -> Result<()> {
        self.write_int(&MAX_AGC_GAIN, None, gain).await
    }

    pub async fn dde_gain(&self) -> Result<i32> {
        self.read_int(&DDE_GAIN, None).await
    }

    pub async fn set_dde_gain(&self, gain: i32) -> Result<()> {
        self.write_int(&DDE_GAIN, None, gain).await
    }

    /// DDE spatial threshold, -20..=100. Negative values blur, positive
    /// values sharpen.
    pub async fn spatial_threshold(&self) -> Result<i32> {
        self.read_int(&SPATIAL_THRESHOLD, None).await
    }

    pub async fn set_spatial_threshold(&self, threshold: i32) -> Result<()> {
        self.write_int(&SPATIAL_THRESHOLD, None, threshold).await
    }

    /// Detector gain state. Changed through [`set_range_mode`](Self::set_range_mode).
    pub async fn gain_mode(&self) -> Result<GainMode> {
        self.read_word(&GAIN_MODE, None).await
    }

    // ---------------------------------------------------------------
    // Isotherms and spot meter
    // ---------------------------------------------------------------

    const ISOTHERM_ENABLE: Option<Selector> = Some(Selector::Isotherm(IsothermCommand::Enable));
    const ISOTHERM_UNIT: Option<Selector> = Some(Selector::Isotherm(IsothermCommand::Unit));

    pub async fn isotherm_enabled(&self) -> Result<bool> {
        self.read_word(&ISOTHERM, Self::ISOTHERM_ENABLE).await
    }

    pub async fn set_isotherm_enabled(&self, on: bool) -> Result<()> {
        self.write_word(&ISOTHERM, Self::ISOTHERM_ENABLE, on).await
    }

    pub async fn isotherm_unit(&self) -> Result<ThresholdUnit> {
        self.read_word(&ISOTHERM, Self::ISOTHERM_UNIT).await
    }

    pub async fn set_isotherm_unit(&self, unit: ThresholdUnit) -> Result<()> {
        self.write_word(&ISOTHERM, Self::ISOTHERM_UNIT, unit).await
    }

    pub async fn isotherm_thresholds(&self) -> Result<IsothermThresholds> {
        registry::parse_thresholds(&self.read_bytes(&ISOTHERM_THRESHOLDS).await?)
    }

    /// Set all three isotherm thresholds. Fails locally unless
    /// `lower <= middle <= upper`.
    pub async fn set_isotherm_thresholds(&self, lower: i16, middle: i16, upper: i16) -> Result<()> {
        let thresholds = IsothermThresholds::new(lower, middle, upper).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "isotherm thresholds {lower}/{middle}/{upper} must satisfy lower <= middle <= upper"
            ))
        })?;
        self.write(&ISOTHERM_THRESHOLDS, None, &registry::encode_thresholds(&thresholds))
            .await
    }

    pub async fn set_isotherm_lower(&self, lower: i16) -> Result<()> {
        let t = self.isotherm_thresholds().await?;
        self.set_isotherm_thresholds(lower, t.middle(), t.upper()).await
    }

    pub async fn set_isotherm_middle(&self, middle: i16) -> Result<()> {
        let t = self.isotherm_thresholds().await?;
        self.set_isotherm_thresholds(t.lower(), middle, t.upper()).await
    }

    pub async fn set_isotherm_upper(&self, upper: i16) -> Result<()> {
        let t = self.isotherm_thresholds().await?;
        self.set_isotherm_thresholds(t.lower(), t.middle(), upper).await
    }

    pub async fn spot_meter_mode(&self) -> Result<SpotMeterMode> {
        self.read_word(&SPOT_METER_MODE, None).await
    }

    pub async fn set_spot_meter_mode(&self, mode: SpotMeterMode) -> Result<()> {
        self.write_word(&SPOT_METER_MODE, None, mode).await
    }

    pub async fn spot_display(&self) -> Result<SpotDisplayMode> {
        self.read_word(&SPOT_DISPLAY, None).await
    }

    pub async fn set_spot_display(&self, mode: SpotDisplayMode) -> Result<()> {
        self.write_word(&SPOT_DISPLAY, None, mode).await
    }

    /// Spot meter reading in °C.
    pub async fn spot_meter_temperature(&self) -> Result<f64> {
        Ok(self.read_int(&SPOT_METER_VALUE, None).await? as f64)
    }

    // ---------------------------------------------------------------
    // Radiometry
    // ---------------------------------------------------------------

    const RADIOMETRY_MODE: Option<Selector> = Some(Selector::Radiometry(RadiometryCommand::Mode));
    const RADIOMETRY_RESOLUTION: Option<Selector> =
        Some(Selector::Radiometry(RadiometryCommand::Resolution));

    /// Whether the core supports radiometry at all.
    pub async fn is_radiometric(&self) -> Result<bool> {
        match self.read(&RADIOMETRY, Self::RADIOMETRY_MODE).await {
            Ok(_) => Ok(true),
            Err(Error::Device(ResponseStatus::FeatureNotEnabled)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn radiometry_mode(&self) -> Result<bool> {
        self.read_word(&RADIOMETRY, Self::RADIOMETRY_MODE).await
    }

    pub async fn set_radiometry_mode(&self, on: bool) -> Result<()> {
        self.write_word(&RADIOMETRY, Self::RADIOMETRY_MODE, on).await
    }

    pub async fn radiometry_high_resolution(&self) -> Result<bool> {
        self.read_word(&RADIOMETRY, Self::RADIOMETRY_RESOLUTION).await
    }

    pub async fn set_radiometry_high_resolution(&self, on: bool) -> Result<()> {
        self.write_word(&RADIOMETRY, Self::RADIOMETRY_RESOLUTION, on)
            .await
    }

    /// Send the current scene parameters to the camera so its on-board
    /// measurement (spot meter) agrees with host-side conversions.
    pub async fn push_radiometric_parameters(&self) -> Result<()> {
        let state = *self.engine().state();
        let kelvin = |k: f64| Argument::Int32((k * 100.0).round() as i32);
        let params = [
            (
                RadiometricParameter::Emissivity,
                Argument::Int32((state.emissivity * UNITY_SCALE).round() as i32),
            ),
            (RadiometricParameter::BackgroundTemp, kelvin(state.reflected_k)),
            (RadiometricParameter::ReflectedTemp, kelvin(state.reflected_k)),
            (RadiometricParameter::AtmosphericTemp, kelvin(state.atmospheric_k)),
            (
                RadiometricParameter::WindowTransmission,
                Argument::Int32(UNITY_SCALE as i32),
            ),
        ];
        for (param, value) in params {
            debug!(?param, ?value, "pushing radiometric parameter");
            self.write(&LENS_RESPONSE, Some(Selector::Radiometric(param)), &value)
                .await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Temperatures
    // ---------------------------------------------------------------

    /// Shutter temperature in °C.
    pub async fn shutter_temperature(&self) -> Result<f64> {
        Ok(self.read_int(&SHUTTER_TEMP, None).await? as f64 / 100.0)
    }

    /// Focal plane array temperature in °C.
    pub async fn sensor_temperature(&self) -> Result<f64> {
        self.read_sensor(SensorTemp::Sensor).await
    }

    /// Camera housing temperature in °C.
    pub async fn housing_temperature(&self) -> Result<f64> {
        self.read_sensor(SensorTemp::Housing).await
    }

    async fn read_sensor(&self, which: SensorTemp) -> Result<f64> {
        let tenths = self
            .read_int(&READ_SENSOR, Some(Selector::Sensor(which)))
            .await?;
        Ok(tenths as f64 / 10.0)
    }

    // ---------------------------------------------------------------
    // Calibration (local)
    // ---------------------------------------------------------------

    pub fn calibration_state(&self) -> CalibrationState {
        *self.engine().state()
    }

    pub fn emissivity(&self) -> f64 {
        self.engine().state().emissivity
    }

    pub fn set_emissivity(&self, emissivity: f64) -> Result<()> {
        self.engine().set_emissivity(emissivity)
    }

    pub fn reflected_temperature_k(&self) -> f64 {
        self.engine().state().reflected_k
    }

    pub fn set_reflected_temperature_k(&self, kelvin: f64) -> Result<()> {
        self.engine().set_reflected_temperature(kelvin)
    }

    pub fn reflected_temperature_c(&self) -> f64 {
        kelvin_to_celsius(self.reflected_temperature_k())
    }

    pub fn set_reflected_temperature_c(&self, celsius: f64) -> Result<()> {
        self.set_reflected_temperature_k(celsius_to_kelvin(celsius))
    }

    pub fn atmospheric_temperature_k(&self) -> f64 {
        self.engine().state().atmospheric_k
    }

    pub fn set_atmospheric_temperature_k(&self, kelvin: f64) -> Result<()> {
        self.engine().set_atmospheric_temperature(kelvin)
    }

    pub fn atmospheric_temperature_c(&self) -> f64 {
        kelvin_to_celsius(self.atmospheric_temperature_k())
    }

    pub fn set_atmospheric_temperature_c(&self, celsius: f64) -> Result<()> {
        self.set_atmospheric_temperature_k(celsius_to_kelvin(celsius))
    }

    /// Relative humidity, 0..=1.
    pub fn humidity(&self) -> f64 {
        self.engine().state().humidity
    }

    pub fn set_humidity(&self, humidity: f64) -> Result<()> {
        self.engine().set_humidity(humidity)
    }

    /// Object distance in meters.
    pub fn distance(&self) -> f64 {
        self.engine().state().distance_m
    }

    pub fn set_distance(&self, distance_m: f64) -> Result<()> {
        self.engine().set_distance(distance_m)
    }

    /// Convert raw counts to °C under the active calibration.
    pub fn raw_to_temp(&self, raw: u16) -> f64 {
        self.engine().raw_to_temp(raw)
    }

    pub fn temp_to_raw(&self, celsius: f64) -> u16 {
        self.engine().temp_to_raw(celsius)
    }

    /// Convert a whole raw frame under one consistent set of constants.
    pub fn raw_frame_to_temps(&self, raw: &[u16]) -> Vec<f64> {
        self.engine().raw_frame_to_temps(raw)
    }

    // ---------------------------------------------------------------
    // Lens and range management
    // ---------------------------------------------------------------

    pub fn available_lenses(&self) -> Vec<String> {
        self.table.lens_names()
    }

    pub fn current_lens(&self) -> String {
        lock(&self.active).lens.clone()
    }

    pub fn range_mode(&self) -> RangeMode {
        lock(&self.active).range
    }

    /// Whether the current lens has a high-range calibration.
    pub fn high_range_available(&self) -> bool {
        let lens = self.current_lens();
        self.table
            .lens(&lens)
            .is_some_and(|cal| cal.supports_high_range())
    }

    /// Switch to another lens calibration.
    ///
    /// Keeps the current range when the new lens is calibrated for it and
    /// falls back to its lowest calibrated range otherwise. Returns once the
    /// switch has started; poll [`is_set_lens_ready`](Self::is_set_lens_ready)
    /// or await [`wait_lens_ready`](Self::wait_lens_ready).
    pub fn set_lens(&self, name: &str) -> Result<()> {
        let lens = self
            .table
            .lens(name)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown lens {name:?}")))?;
        let current = self.range_mode();
        let range = if lens.range(current).is_some() {
            current
        } else {
            lens.ranges().first().copied().ok_or_else(|| {
                Error::InvalidParameter(format!("lens {name:?} has no calibrated range"))
            })?
        };
        self.start_switch(SwitchTarget {
            lens: name.to_string(),
            range,
        })
    }

    /// Switch the current lens to another measurement range.
    pub fn set_range_mode(&self, range: RangeMode) -> Result<()> {
        let lens = self.current_lens();
        self.start_switch(SwitchTarget { lens, range })
    }

    fn start_switch(&self, target: SwitchTarget) -> Result<()> {
        let calibration = *self
            .table
            .lens(&target.lens)
            .and_then(|lens| lens.range(target.range))
            .ok_or_else(|| {
                Error::InvalidParameter(format!("lens {} has no {} range", target.lens, target.range))
            })?;

        let ctx = SwitchContext {
            session: self.io.handle.for_switch(),
            gate: Arc::clone(&self.gate),
            engine: Arc::clone(&self.engine),
            active: Arc::clone(&self.active),
            events: self.event_tx.clone(),
            poll_interval: self.config.lens_poll_interval,
            timeout: self.config.lens_switch_timeout,
        };
        let task = lens::spawn_switch(ctx, target, calibration)?;
        *lock(&self.switch_task) = Some(task);
        Ok(())
    }

    /// Non-blocking poll of the switch state.
    ///
    /// `Ok(true)` once no switch is running. The outcome of a finished
    /// switch is reported once: a failed switch returns its error.
    pub fn is_set_lens_ready(&self) -> Result<bool> {
        self.gate.poll_ready()
    }

    /// Wait for the running switch, if any, to finish.
    pub async fn wait_lens_ready(&self) -> Result<()> {
        self.gate.wait_ready().await
    }

    /// Cancel the running switch. The camera finishes the command it is
    /// executing; the current lens and calibration stay unchanged.
    pub fn cancel_lens_switch(&self) -> bool {
        self.gate.cancel()
    }

    pub fn switch_state(&self) -> SwitchState {
        self.gate.state()
    }

    /// Watch switch state transitions.
    pub fn watch_switch(&self) -> watch::Receiver<SwitchState> {
        self.gate.subscribe()
    }

    /// Subscribe to lens/range switch events.
    pub fn subscribe(&self) -> broadcast::Receiver<CameraEvent> {
        self.event_tx.subscribe()
    }

    /// Stop the session and close the serial channel.
    pub async fn close(&self) -> Result<()> {
        self.gate.cancel();
        let mut transport = self.io.shutdown().await?;
        transport.close().await
    }
}
