//! Parameter registry: descriptors, argument encoding and reply decoding.
//!
//! Every camera setting is described by a [`Parameter`]: its function code,
//! how its value is laid out on the wire, whether it can be read or written,
//! its valid range, and which sub-selector (if any) precedes the value.
//! The functions here turn a descriptor plus a typed value into a
//! [`CommandFrame`] and turn a reply payload back into an [`Argument`].
//!
//! All functions are pure. Range and direction checks happen here, before a
//! frame exists, so a rejected argument never reaches the transport.

use taulib_core::{
    AgcType, DigitalOutputDepth, Error, ExternalSyncMode, FfcMode, IsothermThresholds, LvdsMode,
    Palette, Result, Revision, SensorTemp, SerialNumbers, SpotDisplayMode, SpotMeterMode,
    TestPattern, ThresholdUnit, VideoColorMode, VideoStandard, XpBusMode,
};

use crate::frame::{CommandFrame, FunctionCode};

// ---------------------------------------------------------------
// Encodings and values
// ---------------------------------------------------------------

/// Wire layout of a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentEncoding {
    /// Big-endian 16-bit word.
    Int16,
    /// Big-endian 32-bit word.
    Int32,
    /// Fixed-length raw block.
    ByteArray(usize),
}

impl ArgumentEncoding {
    pub fn byte_len(&self) -> usize {
        match self {
            ArgumentEncoding::Int16 => 2,
            ArgumentEncoding::Int32 => 4,
            ArgumentEncoding::ByteArray(n) => *n,
        }
    }
}

/// A parameter value as carried on the wire.
///
/// Integer variants hold the raw two's-complement word; whether it is read
/// as signed or unsigned is a property of the [`Parameter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Int16(i16),
    Int32(i32),
    Bytes(Vec<u8>),
}

impl Argument {
    /// Big-endian wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Argument::Int16(v) => v.to_be_bytes().to_vec(),
            Argument::Int32(v) => v.to_be_bytes().to_vec(),
            Argument::Bytes(b) => b.clone(),
        }
    }

    fn matches(&self, encoding: ArgumentEncoding) -> bool {
        match (self, encoding) {
            (Argument::Int16(_), ArgumentEncoding::Int16) => true,
            (Argument::Int32(_), ArgumentEncoding::Int32) => true,
            (Argument::Bytes(b), ArgumentEncoding::ByteArray(n)) => b.len() == n,
            _ => false,
        }
    }

    /// The 16-bit word, for enumerated and boolean settings.
    pub fn word(&self) -> Result<u16> {
        match self {
            Argument::Int16(v) => Ok(*v as u16),
            other => Err(Error::Protocol(format!("expected a 16-bit value, got {other:?}"))),
        }
    }

    pub fn bytes(&self) -> Result<&[u8]> {
        match self {
            Argument::Bytes(b) => Ok(b),
            other => Err(Error::Protocol(format!("expected a byte block, got {other:?}"))),
        }
    }
}

/// Which directions a parameter supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
    WriteOnly,
    /// A command without a value, such as triggering an FFC.
    Action,
}

// ---------------------------------------------------------------
// Sub-selectors
// ---------------------------------------------------------------

/// Radiometric value addressed through LENS_RESPONSE_PARAMS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiometricParameter {
    CalibrationBank,
    /// Scaled by 8192.
    Emissivity,
    /// Kelvin × 100.
    BackgroundTemp,
    /// Scaled by 8192.
    WindowTransmission,
    /// Kelvin × 100.
    ReflectedTemp,
    /// Kelvin × 100.
    AtmosphericTemp,
}

/// Radiometry feature addressed through RADIOMETRY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadiometryCommand {
    Resolution,
    Mode,
}

/// Digital output setting addressed through DIGITAL_OUTPUT_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitalOutput {
    XpMode,
    LvdsMode,
    CmosBitDepth,
    LvdsBitDepth,
}

/// Isotherm setting addressed through ISOTHERM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsothermCommand {
    Enable,
    Unit,
}

/// Kind of sub-selector a parameter requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind {
    None,
    Radiometric,
    Radiometry,
    DigitalOutput,
    Isotherm,
    Sensor,
}

/// Leading argument byte that picks one value of a compound parameter.
/// The camera echoes it at the start of the reply payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Radiometric(RadiometricParameter),
    Radiometry(RadiometryCommand),
    DigitalOutput(DigitalOutput),
    Isotherm(IsothermCommand),
    Sensor(SensorTemp),
}

impl Selector {
    pub fn kind(&self) -> SelectorKind {
        match self {
            Selector::Radiometric(_) => SelectorKind::Radiometric,
            Selector::Radiometry(_) => SelectorKind::Radiometry,
            Selector::DigitalOutput(_) => SelectorKind::DigitalOutput,
            Selector::Isotherm(_) => SelectorKind::Isotherm,
            Selector::Sensor(_) => SelectorKind::Sensor,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Selector::Radiometric(p) => match p {
                RadiometricParameter::CalibrationBank => 0x00,
                RadiometricParameter::Emissivity => 0x01,
                RadiometricParameter::BackgroundTemp => 0x02,
                RadiometricParameter::WindowTransmission => 0x03,
                RadiometricParameter::ReflectedTemp => 0x04,
                RadiometricParameter::AtmosphericTemp => 0x05,
            },
            Selector::Radiometry(c) => match c {
                RadiometryCommand::Resolution => 0x00,
                RadiometryCommand::Mode => 0x01,
            },
            Selector::DigitalOutput(d) => match d {
                DigitalOutput::XpMode => 0x00,
                DigitalOutput::LvdsMode => 0x01,
                DigitalOutput::CmosBitDepth => 0x02,
                DigitalOutput::LvdsBitDepth => 0x03,
            },
            Selector::Isotherm(c) => match c {
                IsothermCommand::Enable => 0x00,
                IsothermCommand::Unit => 0x01,
            },
            Selector::Sensor(s) => match s {
                SensorTemp::Sensor => 0x00,
                SensorTemp::Housing => 0x0A,
            },
        }
    }
}

// ---------------------------------------------------------------
// Parameter descriptors
// ---------------------------------------------------------------

/// Static description of one camera setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub function: FunctionCode,
    pub encoding: ArgumentEncoding,
    pub access: Access,
    /// Whether integer words are interpreted as two's complement.
    pub signed: bool,
    /// Inclusive bounds checked before a set is sent.
    pub range: Option<(i32, i32)>,
    pub selector: SelectorKind,
}

impl Parameter {
    const fn int16(name: &'static str, function: FunctionCode) -> Self {
        Parameter {
            name,
            function,
            encoding: ArgumentEncoding::Int16,
            access: Access::ReadWrite,
            signed: false,
            range: None,
            selector: SelectorKind::None,
        }
    }

    const fn action(name: &'static str, function: FunctionCode) -> Self {
        Parameter {
            access: Access::Action,
            ..Parameter::int16(name, function)
        }
    }

    const fn encoded(self, encoding: ArgumentEncoding) -> Self {
        Parameter { encoding, ..self }
    }

    const fn read_only(self) -> Self {
        Parameter {
            access: Access::ReadOnly,
            ..self
        }
    }

    const fn signed(self) -> Self {
        Parameter {
            signed: true,
            ..self
        }
    }

    const fn range(self, min: i32, max: i32) -> Self {
        Parameter {
            range: Some((min, max)),
            ..self
        }
    }

    const fn selected_by(self, selector: SelectorKind) -> Self {
        Parameter { selector, ..self }
    }

    /// Validate an integer value and convert it to its wire argument.
    ///
    /// Fails with [`Error::InvalidParameter`] when the value is outside the
    /// parameter's range or cannot be represented by its encoding.
    pub fn to_argument(&self, value: i32) -> Result<Argument> {
        if let Some((min, max)) = self.range {
            if value < min || value > max {
                return Err(Error::InvalidParameter(format!(
                    "{} {value} outside {min}..={max}",
                    self.name
                )));
            }
        }
        match self.encoding {
            ArgumentEncoding::Int16 => {
                let word = if self.signed {
                    i16::try_from(value).ok()
                } else {
                    u16::try_from(value).ok().map(|w| w as i16)
                };
                word.map(Argument::Int16).ok_or_else(|| {
                    Error::InvalidParameter(format!("{} {value} does not fit 16 bits", self.name))
                })
            }
            ArgumentEncoding::Int32 => Ok(Argument::Int32(value)),
            ArgumentEncoding::ByteArray(_) => Err(Error::InvalidParameter(format!(
                "{} takes a byte block, not an integer",
                self.name
            ))),
        }
    }

    /// Interpret a decoded argument as an integer.
    pub fn to_value(&self, argument: &Argument) -> Result<i32> {
        match argument {
            Argument::Int16(v) if self.signed => Ok(*v as i32),
            Argument::Int16(v) => Ok(*v as u16 as i32),
            Argument::Int32(v) => Ok(*v),
            Argument::Bytes(_) => Err(Error::Protocol(format!(
                "{} returned a byte block, not an integer",
                self.name
            ))),
        }
    }
}

use FunctionCode as F;

pub const NO_OP: Parameter = Parameter::action("no-op", F::NoOp);
pub const SET_DEFAULTS: Parameter = Parameter::action("set defaults", F::SetDefaults);
pub const CAMERA_RESET: Parameter = Parameter::action("camera reset", F::CameraReset);
pub const RESTORE_FACTORY_DEFAULTS: Parameter =
    Parameter::action("restore factory defaults", F::RestoreFactoryDefaults);
pub const DO_FFC: Parameter = Parameter::action("FFC", F::DoFfc);

pub const SERIAL_NUMBER: Parameter = Parameter::int16("serial number", F::SerialNumber)
    .encoded(ArgumentEncoding::ByteArray(8))
    .read_only();
pub const REVISION: Parameter = Parameter::int16("revision", F::GetRevision)
    .encoded(ArgumentEncoding::ByteArray(8))
    .read_only();
pub const CAMERA_PART: Parameter = Parameter::int16("camera part number", F::CameraPart)
    .encoded(ArgumentEncoding::ByteArray(32))
    .read_only();

pub const GAIN_MODE: Parameter = Parameter::int16("gain mode", F::GainMode).range(0, 3);
pub const FFC_MODE: Parameter = Parameter::int16("FFC mode", F::FfcModeSelect);
pub const FFC_PERIOD: Parameter = Parameter::int16("FFC period", F::FfcPeriod).range(0, 30_000);
pub const FFC_TEMP_DELTA: Parameter =
    Parameter::int16("FFC temperature delta", F::FfcTempDelta).range(0, 1_000);
pub const FFC_WARN_TIME: Parameter =
    Parameter::int16("FFC warn time", F::FfcWarnTime).range(0, 600);
pub const VIDEO_MODE: Parameter = Parameter::int16("video mode", F::VideoMode);
pub const VIDEO_PALETTE: Parameter = Parameter::int16("palette", F::VideoPalette);
pub const VIDEO_ORIENTATION: Parameter =
    Parameter::int16("video orientation", F::VideoOrientation).range(0, 3);
pub const VIDEO_COLOR_MODE: Parameter = Parameter::int16("video color mode", F::VideoColorMode);
pub const VIDEO_STANDARD: Parameter = Parameter::int16("video standard", F::VideoStandard);
pub const DIGITAL_OUTPUT: Parameter = Parameter::int16("digital output", F::DigitalOutputMode)
    .selected_by(SelectorKind::DigitalOutput);
pub const TEST_PATTERN: Parameter = Parameter::int16("test pattern", F::TestPattern);
pub const EXTERNAL_SYNC: Parameter = Parameter::int16("external sync", F::ExternalSync);

pub const AGC_TYPE: Parameter = Parameter::int16("AGC type", F::AgcType);
pub const CONTRAST: Parameter = Parameter::int16("contrast", F::Contrast).range(0, 255);
pub const BRIGHTNESS: Parameter = Parameter::int16("brightness", F::Brightness).range(0, 16_383);
pub const BRIGHTNESS_BIAS: Parameter = Parameter::int16("brightness bias", F::BrightnessBias)
    .signed()
    .range(-16_384, 16_383);
pub const AGC_FILTER: Parameter = Parameter::int16("AGC filter", F::AgcFilter).range(0, 255);
pub const PLATEAU_LEVEL: Parameter =
    Parameter::int16("plateau level", F::PlateauLevel).range(0, 4_095);
pub const AGC_MIDPOINT: Parameter = Parameter::int16("AGC midpoint", F::AgcMidpoint).range(0, 255);
pub const MAX_AGC_GAIN: Parameter = Parameter::int16("max AGC gain", F::MaxAgcGain).range(0, 255);
pub const DDE_GAIN: Parameter = Parameter::int16("DDE gain", F::DdeGain).range(0, 65_535);
pub const SPATIAL_THRESHOLD: Parameter =
    Parameter::int16("spatial threshold", F::SpatialThreshold)
        .signed()
        .range(-20, 100);

pub const ISOTHERM: Parameter =
    Parameter::int16("isotherm", F::Isotherm).selected_by(SelectorKind::Isotherm);
pub const ISOTHERM_THRESHOLDS: Parameter =
    Parameter::int16("isotherm thresholds", F::IsothermThresholds)
        .encoded(ArgumentEncoding::ByteArray(6));

pub const SPOT_METER_MODE: Parameter = Parameter::int16("spot meter mode", F::SpotMeterMode);
pub const SPOT_DISPLAY: Parameter = Parameter::int16("spot display", F::SpotDisplay);
/// Spot meter reading in whole °C.
pub const SPOT_METER_VALUE: Parameter = Parameter::int16("spot meter value", F::GetSpotMeter)
    .signed()
    .read_only();
/// Sensor or housing temperature in °C × 10.
pub const READ_SENSOR: Parameter = Parameter::int16("sensor temperature", F::ReadSensor)
    .signed()
    .read_only()
    .selected_by(SelectorKind::Sensor);
/// Shutter temperature in °C × 100.
pub const SHUTTER_TEMP: Parameter = Parameter::int16("shutter temperature", F::ShutterTemp)
    .signed()
    .read_only();

pub const RADIOMETRY: Parameter =
    Parameter::int16("radiometry", F::Radiometry).selected_by(SelectorKind::Radiometry);
pub const LENS_RESPONSE: Parameter = Parameter::int16("lens response", F::LensResponseParams)
    .encoded(ArgumentEncoding::Int32)
    .signed()
    .selected_by(SelectorKind::Radiometric);

// ---------------------------------------------------------------
// Frame builders and reply decoding
// ---------------------------------------------------------------

fn check_selector(param: &Parameter, selector: Option<Selector>) -> Result<Vec<u8>> {
    match (param.selector, selector) {
        (SelectorKind::None, None) => Ok(Vec::new()),
        (kind, Some(sel)) if sel.kind() == kind => Ok(vec![sel.code()]),
        (kind, sel) => Err(Error::InvalidParameter(format!(
            "{} expects selector {kind:?}, got {sel:?}",
            param.name
        ))),
    }
}

/// Build the query frame for a readable parameter.
pub fn build_get(param: &Parameter, selector: Option<Selector>) -> Result<CommandFrame> {
    match param.access {
        Access::ReadWrite | Access::ReadOnly => {}
        Access::WriteOnly | Access::Action => {
            return Err(Error::Unsupported(format!("{} cannot be read", param.name)));
        }
    }
    let args = check_selector(param, selector)?;
    CommandFrame::new(param.function, args)
}

/// Build the frame that writes `value` to a writable parameter.
pub fn build_set(
    param: &Parameter,
    selector: Option<Selector>,
    value: &Argument,
) -> Result<CommandFrame> {
    match param.access {
        Access::ReadWrite | Access::WriteOnly => {}
        Access::ReadOnly | Access::Action => {
            return Err(Error::Unsupported(format!("{} cannot be written", param.name)));
        }
    }
    if !value.matches(param.encoding) {
        return Err(Error::InvalidParameter(format!(
            "{} expects {:?}, got {value:?}",
            param.name, param.encoding
        )));
    }
    if param.range.is_some() {
        param.to_argument(param.to_value(value)?)?;
    }
    let mut args = check_selector(param, selector)?;
    args.extend(value.to_bytes());
    CommandFrame::new(param.function, args)
}

/// Build the frame for an argument-less action.
pub fn build_action(param: &Parameter) -> Result<CommandFrame> {
    if param.access != Access::Action {
        return Err(Error::Unsupported(format!("{} is not an action", param.name)));
    }
    Ok(CommandFrame::bare(param.function))
}

/// Decode a reply payload into the parameter's argument.
///
/// When a selector was sent, the reply must echo it as its first byte.
pub fn decode_value(
    param: &Parameter,
    selector: Option<Selector>,
    payload: &[u8],
) -> Result<Argument> {
    let mut data = payload;
    if let Some(sel) = selector {
        match data.split_first() {
            Some((&echo, rest)) if echo == sel.code() => data = rest,
            _ => {
                return Err(Error::Protocol(format!(
                    "{} reply does not echo selector {:#04X}: {payload:02X?}",
                    param.name,
                    sel.code()
                )));
            }
        }
    }

    let len = param.encoding.byte_len();
    if data.len() < len {
        return Err(Error::Protocol(format!(
            "{} reply too short: expected {len} bytes, got {}",
            param.name,
            data.len()
        )));
    }
    let data = &data[..len];
    Ok(match param.encoding {
        ArgumentEncoding::Int16 => Argument::Int16(i16::from_be_bytes([data[0], data[1]])),
        ArgumentEncoding::Int32 => {
            Argument::Int32(i32::from_be_bytes([data[0], data[1], data[2], data[3]]))
        }
        ArgumentEncoding::ByteArray(_) => Argument::Bytes(data.to_vec()),
    })
}

// ---------------------------------------------------------------
// Enumerated values
// ---------------------------------------------------------------

/// A setting whose value is one 16-bit word on the wire.
pub trait WireValue: Sized + Copy {
    fn to_wire(self) -> u16;
    fn from_wire(word: u16) -> Result<Self>;

    fn to_argument(self) -> Argument {
        Argument::Int16(self.to_wire() as i16)
    }
}

impl WireValue for bool {
    fn to_wire(self) -> u16 {
        self as u16
    }

    fn from_wire(word: u16) -> Result<Self> {
        Ok(word != 0)
    }
}

macro_rules! wire_values {
    ($ty:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        impl WireValue for $ty {
            fn to_wire(self) -> u16 {
                match self {
                    $( $ty::$variant => $code, )+
                }
            }

            fn from_wire(word: u16) -> Result<Self> {
                match word {
                    $( $code => Ok($ty::$variant), )+
                    other => Err(Error::Protocol(format!(
                        concat!("unknown ", stringify!($ty), " value {:#06X}"),
                        other
                    ))),
                }
            }
        }
    };
}

/// Detector gain state driven by GAIN_MODE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainMode {
    Automatic,
    Low,
    High,
    Manual,
}

wire_values!(GainMode { Automatic = 0x0000, Low = 0x0001, High = 0x0002, Manual = 0x0003 });
wire_values!(FfcMode { Manual = 0x0000, Auto = 0x0001, External = 0x0002 });
wire_values!(XpBusMode { Disabled = 0x0000, Bt656 = 0x0001, Cmos = 0x0002 });
wire_values!(LvdsMode { Disabled = 0x0000, Enabled = 0x0001 });
wire_values!(DigitalOutputDepth {
    Bits14 = 0x0000,
    Bits8 = 0x0001,
    Bits8Bayer = 0x0002,
    Bits16YCbCr = 0x0003,
});
wire_values!(TestPattern {
    Off = 0x0000,
    Ramp14b = 0x0001,
    BigVertical = 0x0002,
    HorizontalShade = 0x0003,
    FactoryUse = 0x0004,
    ColorBars = 0x0005,
    RampWithSteps = 0x0008,
});
wire_values!(Palette {
    WhiteHot = 0x0000,
    BlackHot = 0x0001,
    Fusion = 0x0002,
    Rainbow = 0x0003,
    Globow = 0x0004,
    Ironbow1 = 0x0005,
    Ironbow2 = 0x0006,
    Sepia = 0x0007,
    Color1 = 0x0008,
    Color2 = 0x0009,
    Icefire = 0x000A,
    Rain = 0x000B,
    RedHot = 0x000C,
    GreenHot = 0x000D,
});
wire_values!(AgcType {
    PlateauHistogram = 0x0000,
    OnceBright = 0x0001,
    AutoBright = 0x0002,
    Manual = 0x0003,
    NotDefined = 0x0004,
    Linear = 0x0005,
});
wire_values!(ThresholdUnit { Celsius = 0x0000, Percentage = 0x0001 });
wire_values!(VideoColorMode { Monochrome = 0x0000, Color = 0x0001 });
wire_values!(VideoStandard { Ntsc30 = 0x0000, Pal25 = 0x0001, Ntsc60 = 0x0003, Pal50 = 0x0004 });
wire_values!(SpotDisplayMode { Off = 0x0000, Numeric = 0x0001, Thermometer = 0x0002, Both = 0x0003 });
wire_values!(SpotMeterMode { Off = 0x0000, Fahrenheit = 0x0001, Celsius = 0x0002 });
wire_values!(ExternalSyncMode { Disabled = 0x0000, Slave = 0x0001, Master = 0x0002 });

/// VIDEO_MODE word with analog video switched off.
pub const VIDEO_MODE_ANALOG_OFF: u16 = 0x0002;

/// VIDEO_ORIENTATION bit for a vertically flipped image.
pub const ORIENTATION_INVERT: u16 = 0x0001;
/// VIDEO_ORIENTATION bit for a horizontally mirrored image.
pub const ORIENTATION_REVERT: u16 = 0x0002;

// ---------------------------------------------------------------
// Byte-block payloads
// ---------------------------------------------------------------

/// Parse the SERIAL_NUMBER reply: camera then sensor serial, u32 each.
pub fn parse_serial_numbers(data: &[u8]) -> Result<SerialNumbers> {
    if data.len() < 8 {
        return Err(Error::Protocol(format!("serial number reply too short: {data:02X?}")));
    }
    Ok(SerialNumbers {
        camera: u32::from_be_bytes([data[0], data[1], data[2], data[3]]),
        sensor: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
    })
}

/// Parse the GET_REVISION reply: software major/minor, firmware major/minor.
pub fn parse_revision(data: &[u8]) -> Result<Revision> {
    if data.len() < 8 {
        return Err(Error::Protocol(format!("revision reply too short: {data:02X?}")));
    }
    let word = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
    Ok(Revision {
        software_major: word(0),
        software_minor: word(2),
        firmware_major: word(4),
        firmware_minor: word(6),
    })
}

/// Parse the CAMERA_PART reply: ASCII, NUL padded.
pub fn parse_part_number(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).trim().to_string()
}

pub fn encode_thresholds(thresholds: &IsothermThresholds) -> Argument {
    let mut bytes = Vec::with_capacity(6);
    bytes.extend_from_slice(&thresholds.lower().to_be_bytes());
    bytes.extend_from_slice(&thresholds.middle().to_be_bytes());
    bytes.extend_from_slice(&thresholds.upper().to_be_bytes());
    Argument::Bytes(bytes)
}

pub fn parse_thresholds(data: &[u8]) -> Result<IsothermThresholds> {
    if data.len() < 6 {
        return Err(Error::Protocol(format!("isotherm threshold reply too short: {data:02X?}")));
    }
    let word = |i: usize| i16::from_be_bytes([data[i], data[i + 1]]);
    IsothermThresholds::new(word(0), word(2), word(4)).ok_or_else(|| {
        Error::Protocol(format!(
            "camera reported unordered isotherm thresholds {}/{}/{}",
            word(0),
            word(2),
            word(4)
        ))
    })
}
