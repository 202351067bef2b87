//! Basic WIC camera control.
//!
//! Connects to a WIC camera over its serial bridge, prints identity and
//! temperatures, applies the WIC defaults and triggers an FFC.
//!
//! # Requirements
//!
//! - A WIC camera whose serial bridge is exposed as a serial port
//! - The serial port path adjusted for your system (e.g. `/dev/ttyUSB0`
//!   on Linux, `COM3` on Windows)
//!
//! # Usage
//!
//! ```sh
//! RUST_LOG=taulib_wic=debug cargo run -p taulib --example basic_camera
//! ```

use std::time::Duration;

use taulib::wic::calibration::CalibrationTable;
use taulib::wic::{CameraIdentity, WicBuilder};
use taulib::{CameraSpeed, Palette, Resolution};

const CALIBRATION: &str = "\
019mm low    0 300000 1 1430 1 -1500
019mm middle 1 40000  1 1000 1 -300
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Adjust this to match your system's serial port.
    let serial_port = "/dev/ttyUSB0";

    let identity = CameraIdentity::new(
        "Workswell",
        "WIC 640",
        "WIC-640-30",
        CameraSpeed::Hz30,
        Resolution::R640,
    );
    let table: CalibrationTable = CALIBRATION.parse()?;

    println!("Connecting to {} on {}...", identity.model, serial_port);
    let camera = WicBuilder::new(identity, table)
        .serial_port(serial_port)
        .command_timeout(Duration::from_millis(300))
        .build()
        .await?;

    let serials = camera.serial_numbers().await?;
    println!(
        "Connected: {} {} (camera #{}, sensor #{})",
        camera.manufacturer(),
        camera.model(),
        serials.camera,
        serials.sensor
    );
    println!("Core part number: {}", camera.camera_part_number().await?);
    println!("Revision: {}", camera.revision().await?);
    println!("Supported: {}", camera.is_supported().await?);
    println!("Radiometric: {}", camera.is_radiometric().await?);

    println!(
        "Sensor {:.1} °C, housing {:.1} °C, shutter {:.2} °C",
        camera.sensor_temperature().await?,
        camera.housing_temperature().await?,
        camera.shutter_temperature().await?
    );

    println!("\nApplying WIC defaults...");
    camera.set_default().await?;
    camera.set_palette(Palette::Ironbow1).await?;
    println!("Palette now: {}", camera.palette().await?);

    println!("Running FFC...");
    camera.do_ffc().await?;

    camera.close().await?;
    println!("\nDone.");
    Ok(())
}
