//! Switch lens calibration and range mode while watching switch events.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p taulib --example lens_switch
//! ```

use std::time::Duration;

use taulib::wic::{CameraIdentity, WicBuilder};
use taulib::{CameraEvent, CameraSpeed, RangeMode, Resolution};

const CALIBRATION: &str = "\
019mm low    0 300000 1 1430 1 -1500
019mm middle 1 40000  1 1000 1 -300
019mm high   2 70000  1 3000 1 -300
035mm low    3 300000 1 1430 1 -1500
035mm middle 4 40000  1 1000 1 -300
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let serial_port = "/dev/ttyUSB0";
    let identity = CameraIdentity::new(
        "Workswell",
        "WIC 336",
        "WIC-336-9",
        CameraSpeed::Hz9,
        Resolution::R336,
    );

    let camera = WicBuilder::new(identity, CALIBRATION.parse()?)
        .serial_port(serial_port)
        .lens("019mm")
        .lens_switch_timeout(Duration::from_secs(120))
        .build()
        .await?;

    println!("Lenses: {}", camera.available_lenses().join(", "));
    println!(
        "Current: {} ({} range, high range available: {})",
        camera.current_lens(),
        camera.range_mode(),
        camera.high_range_available()
    );

    let mut events = camera.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                CameraEvent::SwitchStarted { lens, range } => {
                    println!("  switching to {lens} ({range})...")
                }
                CameraEvent::SwitchCompleted { lens, range } => {
                    println!("  now on {lens} ({range})")
                }
                CameraEvent::SwitchFailed { lens, range, reason } => {
                    println!("  switch to {lens} ({range}) failed: {reason}")
                }
            }
        }
    });

    camera.set_lens("035mm")?;
    // Poll the way a UI would; wait_lens_ready() is the awaitable form.
    while !camera.is_set_lens_ready()? {
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    camera.set_range_mode(RangeMode::Middle)?;
    camera.wait_lens_ready().await?;

    println!(
        "Final: {} ({} range)",
        camera.current_lens(),
        camera.range_mode()
    );
    Ok(())
}
