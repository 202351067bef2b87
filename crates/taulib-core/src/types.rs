//! Setting types shared by the camera driver and its callers.
//!
//! Every enumerated camera setting implements `Display` and `FromStr`, so
//! command-line tools and configuration files can name settings by string.
//! Wire encodings live with the protocol engine, not here.

use std::fmt;
use std::str::FromStr;

/// Error returned when a string does not name a value of a setting enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSettingError {
    kind: &'static str,
    value: String,
}

impl ParseSettingError {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        ParseSettingError {
            kind,
            value: value.into(),
        }
    }
}

impl fmt::Display for ParseSettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for ParseSettingError {}

/// Declares a fieldless setting enum with its canonical display name and
/// any extra spellings accepted by `FromStr` (matched case-insensitively).
macro_rules! setting_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $display:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let s = match self {
                    $( $name::$variant => $display, )+
                };
                write!(f, "{s}")
            }
        }

        impl FromStr for $name {
            type Err = ParseSettingError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let lower = s.to_ascii_lowercase();
                $(
                    if lower == $display $(|| lower == $alias)* {
                        return Ok($name::$variant);
                    }
                )+
                Err(ParseSettingError::new($kind, s))
            }
        }
    };
}

setting_enum! {
    /// Measurement range of the camera. Each range has its own gain
    /// configuration and radiometric calibration.
    ///
    /// - `Low`: roughly -25 to +150 °C
    /// - `Middle`: roughly -40 to +500 °C
    /// - `High`: roughly +400 to +1500 °C, only on lenses calibrated for it
    RangeMode, "range mode" {
        Low => "low",
        Middle => "middle" | "mid",
        High => "high",
    }
}

impl RangeMode {
    /// Position of this range in per-range tables.
    pub fn index(&self) -> usize {
        match self {
            RangeMode::Low => 0,
            RangeMode::Middle => 1,
            RangeMode::High => 2,
        }
    }
}

setting_enum! {
    /// Flat field correction trigger mode.
    FfcMode, "FFC mode" {
        Manual => "manual",
        Auto => "auto",
        External => "external",
    }
}

setting_enum! {
    /// Built-in test patterns replacing the sensor image.
    TestPattern, "test pattern" {
        Off => "off",
        Ramp14b => "ramp-14b" | "ramp",
        BigVertical => "big-vertical",
        HorizontalShade => "horizontal-shade",
        FactoryUse => "factory-use",
        ColorBars => "color-bars",
        RampWithSteps => "ramp-with-steps",
    }
}

setting_enum! {
    /// Mode of the parallel XP digital bus.
    XpBusMode, "XP bus mode" {
        Disabled => "disabled" | "off",
        Bt656 => "bt656",
        Cmos => "cmos",
    }
}

setting_enum! {
    LvdsMode, "LVDS mode" {
        Disabled => "disabled" | "off",
        Enabled => "enabled" | "on",
    }
}

setting_enum! {
    /// Pixel format on a digital output.
    DigitalOutputDepth, "digital output depth" {
        Bits14 => "14bit" | "14",
        Bits8 => "8bit" | "8",
        Bits8Bayer => "8bit-bayer",
        Bits16YCbCr => "16bit-ycbcr",
    }
}

setting_enum! {
    /// On-board temperature probe.
    SensorTemp, "sensor probe" {
        Sensor => "sensor" | "fpa",
        Housing => "housing",
    }
}

setting_enum! {
    /// Colour palette applied to analog and processed digital video.
    Palette, "palette" {
        WhiteHot => "white-hot",
        BlackHot => "black-hot",
        Fusion => "fusion",
        Rainbow => "rainbow",
        Globow => "globow",
        Ironbow1 => "ironbow1",
        Ironbow2 => "ironbow2",
        Sepia => "sepia",
        Color1 => "color1",
        Color2 => "color2",
        Icefire => "icefire",
        Rain => "rain",
        RedHot => "red-hot",
        GreenHot => "green-hot",
    }
}

setting_enum! {
    /// Automatic gain control algorithm for analog video.
    AgcType, "AGC type" {
        PlateauHistogram => "plateau-histogram" | "plateau",
        OnceBright => "once-bright",
        AutoBright => "auto-bright",
        Manual => "manual",
        NotDefined => "not-defined",
        Linear => "linear",
    }
}

setting_enum! {
    /// Unit in which isotherm thresholds are expressed.
    ThresholdUnit, "threshold unit" {
        Celsius => "celsius" | "c",
        Percentage => "percentage" | "percent" | "%",
    }
}

setting_enum! {
    VideoColorMode, "video color mode" {
        Monochrome => "monochrome" | "mono",
        Color => "color",
    }
}

setting_enum! {
    /// Analog video standard and frame rate.
    VideoStandard, "video standard" {
        Ntsc30 => "ntsc30" | "ntsc",
        Pal25 => "pal25" | "pal",
        Ntsc60 => "ntsc60",
        Pal50 => "pal50",
    }
}

setting_enum! {
    /// In-picture spot meter indicators on analog video.
    SpotDisplayMode, "spot display mode" {
        Off => "off",
        Numeric => "numeric",
        Thermometer => "thermometer",
        Both => "both",
    }
}

setting_enum! {
    /// Spot meter on/off and its display unit.
    SpotMeterMode, "spot meter mode" {
        Off => "off",
        Fahrenheit => "fahrenheit" | "f",
        Celsius => "celsius" | "c",
    }
}

setting_enum! {
    /// External synchronisation role.
    ExternalSyncMode, "external sync mode" {
        Disabled => "disabled" | "off",
        Master => "master",
        Slave => "slave",
    }
}

setting_enum! {
    /// Sensor frame rate of the camera variant.
    CameraSpeed, "camera speed" {
        Hz9 => "9hz" | "9",
        Hz30 => "30hz" | "30",
        Hz60 => "60hz" | "60",
    }
}

setting_enum! {
    /// Sensor resolution of the camera core.
    Resolution, "resolution" {
        R640 => "640x512" | "640",
        R336 => "336x256" | "336",
        R324 => "324x256" | "324",
        R168 => "168x128" | "168",
        R162 => "162x128" | "162",
        R160 => "160x120" | "160",
    }
}

impl Resolution {
    /// Width and height in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Resolution::R640 => (640, 512),
            Resolution::R336 => (336, 256),
            Resolution::R324 => (324, 256),
            Resolution::R168 => (168, 128),
            Resolution::R162 => (162, 128),
            Resolution::R160 => (160, 120),
        }
    }

    /// Derive the resolution from a camera core part number.
    ///
    /// Core part numbers carry the horizontal resolution in characters
    /// 3 to 5, e.g. `46640013H` is a 640-wide core.
    ///
    /// ```
    /// use taulib_core::Resolution;
    ///
    /// assert_eq!(Resolution::from_part_number("46640013H"), Some(Resolution::R640));
    /// assert_eq!(Resolution::from_part_number("46"), None);
    /// ```
    pub fn from_part_number(part_number: &str) -> Option<Resolution> {
        match part_number.trim().get(2..5)? {
            "640" => Some(Resolution::R640),
            "336" => Some(Resolution::R336),
            "324" => Some(Resolution::R324),
            "168" => Some(Resolution::R168),
            "162" => Some(Resolution::R162),
            "160" => Some(Resolution::R160),
            _ => None,
        }
    }
}

/// Isotherm thresholds, in the unit selected by [`ThresholdUnit`].
///
/// The camera requires `lower <= middle <= upper`; [`IsothermThresholds::new`]
/// enforces the ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsothermThresholds {
    lower: i16,
    middle: i16,
    upper: i16,
}

impl IsothermThresholds {
    /// Returns `None` unless `lower <= middle <= upper`.
    pub fn new(lower: i16, middle: i16, upper: i16) -> Option<Self> {
        if lower <= middle && middle <= upper {
            Some(IsothermThresholds {
                lower,
                middle,
                upper,
            })
        } else {
            None
        }
    }

    pub fn lower(&self) -> i16 {
        self.lower
    }

    pub fn middle(&self) -> i16 {
        self.middle
    }

    pub fn upper(&self) -> i16 {
        self.upper
    }
}

impl fmt::Display for IsothermThresholds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.lower, self.middle, self.upper)
    }
}

/// Software and firmware revision reported by the camera core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    pub software_major: u16,
    pub software_minor: u16,
    pub firmware_major: u16,
    pub firmware_minor: u16,
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SW {}.{} / FW {}.{}",
            self.software_major, self.software_minor, self.firmware_major, self.firmware_minor
        )
    }
}

/// Serial numbers of the camera core and its sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialNumbers {
    pub camera: u32,
    pub sensor: u32,
}
