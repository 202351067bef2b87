// taulib test application -- CLI tool for exercising a WIC camera against
// real hardware or a mock transport.
//
// Usage:
//   taulib-test-app --port /dev/ttyUSB0 --calibration cal.txt info
//   taulib-test-app --port /dev/ttyUSB0 --calibration cal.txt get contrast
//   taulib-test-app --port /dev/ttyUSB0 --calibration cal.txt set palette ironbow1
//   taulib-test-app --port /dev/ttyUSB0 --calibration cal.txt lens set 035mm
//   taulib-test-app --port /dev/ttyUSB0 --calibration cal.txt range middle
//   taulib-test-app --mock --calibration cal.txt convert raw 8192 --emissivity 0.95
//
// The calibration file has one line per lens/range:
//   <lens> <low|middle|high> <bank> <R1> <R2> <B> <F> <O>

use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use taulib::wic::calibration::CalibrationTable;
use taulib::wic::{CameraIdentity, SwitchState, WicBuilder, WicCamera};
use taulib::{
    AgcType, CameraSpeed, DigitalOutputDepth, ExternalSyncMode, FfcMode, LvdsMode, Palette,
    RangeMode, SpotDisplayMode, SpotMeterMode, TestPattern, ThresholdUnit,
    VideoColorMode, VideoStandard, XpBusMode,
};
use taulib_test_harness::MockTransport;

/// Calibration used when no file is given: a single lens with the
/// nominal Tau curves.
const DEFAULT_CALIBRATION: &str = "\
default low    0 300000 1 1430 1 -1500
default middle 1 40000  1 1000 1 -300
";

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// taulib test application -- exercises a WIC camera from the command line.
#[derive(Parser)]
#[command(name = "taulib-test-app", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3). Required unless --mock.
    #[arg(long)]
    port: Option<String>,

    /// Baud rate of the camera's serial bridge.
    #[arg(long, default_value_t = 57_600)]
    baud: u32,

    /// Use a mock transport instead of a real serial port.
    /// Useful for checking CLI wiring and offline conversions.
    #[arg(long)]
    mock: bool,

    /// Calibration table file (one lens/range entry per line).
    #[arg(long)]
    calibration: Option<std::path::PathBuf>,

    /// Camera core part number, used to derive the sensor resolution.
    #[arg(long, default_value = "46640013H")]
    part_number: String,

    /// Per-command timeout in milliseconds.
    #[arg(long, default_value_t = 300)]
    timeout_ms: u64,

    /// Verbose logging (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print camera identity, versions and temperatures.
    Info,

    /// Read a setting.
    Get {
        #[arg(value_enum)]
        setting: Setting,
    },

    /// Write a setting.
    Set {
        #[arg(value_enum)]
        setting: Setting,
        /// New value (number, on/off, or a setting name such as `ironbow1`).
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Run a flat field correction.
    Ffc,

    /// Reset the camera core.
    Reset,

    /// Apply the WIC default setup (14-bit CMOS output, radiometry on).
    Default,

    /// Lens calibration management.
    Lens {
        #[command(subcommand)]
        action: LensAction,
    },

    /// Switch the measurement range of the current lens.
    Range {
        #[arg(value_enum)]
        range: RangeArg,
    },

    /// Convert between raw counts and temperature (no camera traffic).
    Convert {
        #[command(subcommand)]
        direction: ConvertDirection,

        #[command(flatten)]
        scene: SceneArgs,
    },
}

#[derive(Subcommand)]
enum LensAction {
    /// List lenses in the calibration table.
    List,
    /// Switch to a lens and wait for the camera to finish.
    Set { name: String },
    /// Print the switch state.
    Status,
}

#[derive(Subcommand)]
enum ConvertDirection {
    /// Raw counts to °C.
    Raw { counts: u16 },
    /// °C to raw counts.
    Temp {
        #[arg(allow_negative_numbers = true)]
        celsius: f64,
    },
}

#[derive(clap::Args)]
struct SceneArgs {
    #[arg(long, default_value_t = 1.0)]
    emissivity: f64,
    /// Reflected temperature in °C.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    reflected: f64,
    /// Atmospheric temperature in °C.
    #[arg(long, default_value_t = 20.0, allow_negative_numbers = true)]
    atmospheric: f64,
    /// Relative humidity, 0..1.
    #[arg(long, default_value_t = 0.5)]
    humidity: f64,
    /// Object distance in meters.
    #[arg(long, default_value_t = 1.0)]
    distance: f64,
}

#[derive(Clone, Copy, ValueEnum)]
enum RangeArg {
    Low,
    Middle,
    High,
}

impl From<RangeArg> for RangeMode {
    fn from(r: RangeArg) -> Self {
        match r {
            RangeArg::Low => RangeMode::Low,
            RangeArg::Middle => RangeMode::Middle,
            RangeArg::High => RangeMode::High,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Setting {
    FfcMode,
    FfcPeriod,
    FfcTempDelta,
    FfcWarnTime,
    AnalogVideo,
    Invert,
    Revert,
    Palette,
    VideoColorMode,
    VideoStandard,
    TestPattern,
    ExternalSync,
    XpBus,
    Lvds,
    CmosDepth,
    LvdsDepth,
    AgcType,
    Contrast,
    Brightness,
    BrightnessBias,
    AgcFilter,
    Plateau,
    AgcMidpoint,
    MaxAgcGain,
    DdeGain,
    SpatialThreshold,
    GainMode,
    Isotherm,
    IsothermUnit,
    IsothermThresholds,
    SpotMeterMode,
    SpotDisplay,
    SpotTemp,
    Radiometry,
    RadiometryHighRes,
    ShutterTemp,
    SensorTemp,
    HousingTemp,
}

// ---------------------------------------------------------------------------
// Camera construction
// ---------------------------------------------------------------------------

fn load_calibration(cli: &Cli) -> Result<CalibrationTable> {
    let text = match &cli.calibration {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading calibration file {}", path.display()))?,
        None => DEFAULT_CALIBRATION.to_string(),
    };
    text.parse::<CalibrationTable>()
        .context("parsing calibration table")
}

async fn create_camera(cli: &Cli) -> Result<WicCamera> {
    let identity = CameraIdentity::from_core_part_number(
        "Workswell",
        "WIC",
        &cli.part_number,
        CameraSpeed::Hz30,
        &cli.part_number,
    )
    .with_context(|| format!("unknown core part number {:?}", cli.part_number))?;

    let builder = WicBuilder::new(identity, load_calibration(cli)?)
        .baud_rate(cli.baud)
        .command_timeout(Duration::from_millis(cli.timeout_ms));

    let camera = if cli.mock {
        builder
            .build_with_transport(Box::new(MockTransport::new()))
            .await?
    } else {
        let port = cli
            .port
            .as_deref()
            .context("--port is required unless --mock is used")?;
        builder
            .serial_port(port)
            .build()
            .await
            .with_context(|| format!("opening camera on {port}"))?
    };
    Ok(camera)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn cmd_info(camera: &WicCamera) -> Result<()> {
    let id = camera.identity();
    println!("Manufacturer:    {}", id.manufacturer);
    println!("Model:           {}", id.model);
    println!(
        "Resolution:      {} ({}x{})",
        id.resolution,
        id.width(),
        id.height()
    );

    let serials = camera.serial_numbers().await?;
    println!("Camera serial:   {}", serials.camera);
    println!("Sensor serial:   {}", serials.sensor);
    println!("Core part:       {}", camera.camera_part_number().await?);
    println!("Revision:        {}", camera.revision().await?);
    println!("Supported:       {}", camera.is_supported().await?);
    println!("Radiometric:     {}", camera.is_radiometric().await?);
    println!("Sensor temp:     {:.1} °C", camera.sensor_temperature().await?);
    println!("Housing temp:    {:.1} °C", camera.housing_temperature().await?);
    println!("Shutter temp:    {:.2} °C", camera.shutter_temperature().await?);
    println!(
        "Lens:            {} ({} range)",
        camera.current_lens(),
        camera.range_mode()
    );
    Ok(())
}

async fn cmd_get(camera: &WicCamera, setting: Setting) -> Result<()> {
    let value = match setting {
        Setting::FfcMode => camera.ffc_mode().await?.to_string(),
        Setting::FfcPeriod => camera.ffc_period().await?.to_string(),
        Setting::FfcTempDelta => camera.ffc_temp_delta().await?.to_string(),
        Setting::FfcWarnTime => camera.ffc_warn_time().await?.to_string(),
        Setting::AnalogVideo => on_off(camera.analog_video().await?),
        Setting::Invert => on_off(camera.invert().await?),
        Setting::Revert => on_off(camera.revert().await?),
        Setting::Palette => camera.palette().await?.to_string(),
        Setting::VideoColorMode => camera.video_color_mode().await?.to_string(),
        Setting::VideoStandard => camera.video_standard().await?.to_string(),
        Setting::TestPattern => camera.test_pattern().await?.to_string(),
        Setting::ExternalSync => camera.external_sync().await?.to_string(),
        Setting::XpBus => camera.xp_bus_mode().await?.to_string(),
        Setting::Lvds => camera.lvds_mode().await?.to_string(),
        Setting::CmosDepth => camera.cmos_bit_depth().await?.to_string(),
        Setting::LvdsDepth => camera.lvds_bit_depth().await?.to_string(),
        Setting::AgcType => camera.agc_type().await?.to_string(),
        Setting::Contrast => camera.contrast().await?.to_string(),
        Setting::Brightness => camera.brightness().await?.to_string(),
        Setting::BrightnessBias => camera.brightness_bias().await?.to_string(),
        Setting::AgcFilter => camera.agc_filter().await?.to_string(),
        Setting::Plateau => camera.plateau_level().await?.to_string(),
        Setting::AgcMidpoint => camera.agc_midpoint().await?.to_string(),
        Setting::MaxAgcGain => camera.max_agc_gain().await?.to_string(),
        Setting::DdeGain => camera.dde_gain().await?.to_string(),
        Setting::SpatialThreshold => camera.spatial_threshold().await?.to_string(),
        Setting::GainMode => format!("{:?}", camera.gain_mode().await?),
        Setting::Isotherm => on_off(camera.isotherm_enabled().await?),
        Setting::IsothermUnit => camera.isotherm_unit().await?.to_string(),
        Setting::IsothermThresholds => camera.isotherm_thresholds().await?.to_string(),
        Setting::SpotMeterMode => camera.spot_meter_mode().await?.to_string(),
        Setting::SpotDisplay => camera.spot_display().await?.to_string(),
        Setting::SpotTemp => format!("{:.0} °C", camera.spot_meter_temperature().await?),
        Setting::Radiometry => on_off(camera.radiometry_mode().await?),
        Setting::RadiometryHighRes => on_off(camera.radiometry_high_resolution().await?),
        Setting::ShutterTemp => format!("{:.2} °C", camera.shutter_temperature().await?),
        Setting::SensorTemp => format!("{:.1} °C", camera.sensor_temperature().await?),
        Setting::HousingTemp => format!("{:.1} °C", camera.housing_temperature().await?),
    };
    println!("{setting:?}: {value}");
    Ok(())
}

async fn cmd_set(camera: &WicCamera, setting: Setting, value: &str) -> Result<()> {
    match setting {
        Setting::FfcMode => camera.set_ffc_mode(parse_setting::<FfcMode>(value)?).await?,
        Setting::FfcPeriod => camera.set_ffc_period(parse_int(value)?).await?,
        Setting::FfcTempDelta => camera.set_ffc_temp_delta(parse_int(value)?).await?,
        Setting::FfcWarnTime => camera.set_ffc_warn_time(parse_int(value)?).await?,
        Setting::AnalogVideo => camera.set_analog_video(parse_bool(value)?).await?,
        Setting::Invert => camera.set_invert(parse_bool(value)?).await?,
        Setting::Revert => camera.set_revert(parse_bool(value)?).await?,
        Setting::Palette => camera.set_palette(parse_setting::<Palette>(value)?).await?,
        Setting::VideoColorMode => {
            camera
                .set_video_color_mode(parse_setting::<VideoColorMode>(value)?)
                .await?
        }
        Setting::VideoStandard => {
            camera
                .set_video_standard(parse_setting::<VideoStandard>(value)?)
                .await?
        }
        Setting::TestPattern => {
            camera
                .set_test_pattern(parse_setting::<TestPattern>(value)?)
                .await?
        }
        Setting::ExternalSync => {
            camera
                .set_external_sync(parse_setting::<ExternalSyncMode>(value)?)
                .await?
        }
        Setting::XpBus => camera.set_xp_bus_mode(parse_setting::<XpBusMode>(value)?).await?,
        Setting::Lvds => camera.set_lvds_mode(parse_setting::<LvdsMode>(value)?).await?,
        Setting::CmosDepth => {
            camera
                .set_cmos_bit_depth(parse_setting::<DigitalOutputDepth>(value)?)
                .await?
        }
        Setting::LvdsDepth => {
            camera
                .set_lvds_bit_depth(parse_setting::<DigitalOutputDepth>(value)?)
                .await?
        }
        Setting::AgcType => camera.set_agc_type(parse_setting::<AgcType>(value)?).await?,
        Setting::Contrast => camera.set_contrast(parse_int(value)?).await?,
        Setting::Brightness => camera.set_brightness(parse_int(value)?).await?,
        Setting::BrightnessBias => camera.set_brightness_bias(parse_int(value)?).await?,
        Setting::AgcFilter => camera.set_agc_filter(parse_int(value)?).await?,
        Setting::Plateau => camera.set_plateau_level(parse_int(value)?).await?,
        Setting::AgcMidpoint => camera.set_agc_midpoint(parse_int(value)?).await?,
        Setting::MaxAgcGain => camera.set_max_agc_gain(parse_int(value)?).await?,
        Setting::DdeGain => camera.set_dde_gain(parse_int(value)?).await?,
        Setting::SpatialThreshold => camera.set_spatial_threshold(parse_int(value)?).await?,
        Setting::Isotherm => camera.set_isotherm_enabled(parse_bool(value)?).await?,
        Setting::IsothermUnit => {
            camera
                .set_isotherm_unit(parse_setting::<ThresholdUnit>(value)?)
                .await?
        }
        Setting::IsothermThresholds => {
            let parts: Vec<i16> = value
                .split('/')
                .map(|p| p.trim().parse::<i16>())
                .collect::<std::result::Result<_, _>>()
                .with_context(|| format!("expected lower/middle/upper, got {value:?}"))?;
            let [lower, middle, upper] = parts[..] else {
                bail!("expected lower/middle/upper, got {value:?}");
            };
            camera.set_isotherm_thresholds(lower, middle, upper).await?
        }
        Setting::SpotMeterMode => {
            camera
                .set_spot_meter_mode(parse_setting::<SpotMeterMode>(value)?)
                .await?
        }
        Setting::SpotDisplay => {
            camera
                .set_spot_display(parse_setting::<SpotDisplayMode>(value)?)
                .await?
        }
        Setting::Radiometry => camera.set_radiometry_mode(parse_bool(value)?).await?,
        Setting::RadiometryHighRes => {
            camera
                .set_radiometry_high_resolution(parse_bool(value)?)
                .await?
        }
        Setting::GainMode => bail!("gain mode follows the range; use `range` instead"),
        Setting::SpotTemp | Setting::ShutterTemp | Setting::SensorTemp | Setting::HousingTemp => {
            bail!("{setting:?} is read-only")
        }
    }
    println!("{setting:?} set to {value}");
    Ok(())
}

async fn cmd_lens(camera: &WicCamera, action: &LensAction) -> Result<()> {
    match action {
        LensAction::List => {
            let current = camera.current_lens();
            for lens in camera.available_lenses() {
                let marker = if lens == current { "*" } else { " " };
                println!("{marker} {lens}");
            }
        }
        LensAction::Set { name } => {
            camera.set_lens(name)?;
            wait_for_switch(camera).await?;
        }
        LensAction::Status => match camera.switch_state() {
            SwitchState::Idle => println!(
                "idle: {} ({} range)",
                camera.current_lens(),
                camera.range_mode()
            ),
            SwitchState::InProgress { target } => println!("switching to {target}"),
            SwitchState::Ready { target, outcome } => {
                println!("finished switch to {target}: {outcome:?}")
            }
        },
    }
    Ok(())
}

async fn wait_for_switch(camera: &WicCamera) -> Result<()> {
    let started = std::time::Instant::now();
    println!("Switching calibration, this can take a few minutes...");
    camera
        .wait_lens_ready()
        .await
        .context("lens/range switch failed")?;
    println!(
        "Now on {} ({} range) after {:.1}s",
        camera.current_lens(),
        camera.range_mode(),
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

fn cmd_convert(camera: &WicCamera, direction: &ConvertDirection, scene: &SceneArgs) -> Result<()> {
    camera.set_emissivity(scene.emissivity)?;
    camera.set_reflected_temperature_c(scene.reflected)?;
    camera.set_atmospheric_temperature_c(scene.atmospheric)?;
    camera.set_humidity(scene.humidity)?;
    camera.set_distance(scene.distance)?;

    match direction {
        ConvertDirection::Raw { counts } => {
            println!("{counts} counts = {:.2} °C", camera.raw_to_temp(*counts));
        }
        ConvertDirection::Temp { celsius } => {
            println!("{celsius:.2} °C = {} counts", camera.temp_to_raw(*celsius));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Value parsing
// ---------------------------------------------------------------------------

fn parse_setting<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(value.parse::<T>()?)
}

fn parse_int(value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .with_context(|| format!("expected an integer, got {value:?}"))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => bail!("expected on/off, got {value:?}"),
    }
}

fn on_off(on: bool) -> String {
    (if on { "on" } else { "off" }).to_string()
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let camera = create_camera(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&camera).await,
        Command::Get { setting } => cmd_get(&camera, *setting).await,
        Command::Set { setting, value } => cmd_set(&camera, *setting, value).await,
        Command::Ffc => camera.do_ffc().await.map_err(Into::into),
        Command::Reset => camera.camera_reset().await.map_err(Into::into),
        Command::Default => camera.set_default().await.map_err(Into::into),
        Command::Lens { action } => cmd_lens(&camera, action).await,
        Command::Range { range } => match camera.set_range_mode((*range).into()) {
            Ok(()) => wait_for_switch(&camera).await,
            Err(e) => Err(e.into()),
        },
        Command::Convert { direction, scene } => cmd_convert(&camera, direction, scene),
    };

    if let Err(e) = camera.close().await {
        tracing::debug!(error = %e, "closing camera");
    }
    result
}
