//! Convert a raw 14-bit frame to temperatures offline.
//!
//! No camera is needed: the calibration engine is pure math. A synthetic
//! gradient stands in for a frame captured from the video stream.
//!
//! # Usage
//!
//! ```sh
//! cargo run -p taulib --example thermal_frame
//! ```

use taulib::RangeMode;
use taulib::wic::calibration::{CalibrationEngine, PlanckConstants};

fn main() -> anyhow::Result<()> {
    let curve = PlanckConstants::new(300_000.0, 1.0, 1_430.0, 1.0, -1_500.0)?;
    let mut engine = CalibrationEngine::new(curve, RangeMode::Low);
    engine.set_emissivity(0.95)?;
    engine.set_distance(2.0)?;
    engine.set_humidity(0.4)?;

    let (width, height) = (16usize, 4usize);
    let frame: Vec<u16> = (0..width * height)
        .map(|i| 4_000 + (i as u16) * 150)
        .collect();

    let temps = engine.raw_frame_to_temps(&frame);
    for row in temps.chunks(width) {
        let line: Vec<String> = row.iter().map(|t| format!("{t:6.1}")).collect();
        println!("{}", line.join(" "));
    }

    let k = engine.recalculate_constants();
    println!(
        "\ngain {:.4}, offset {:.1} counts, transmission {:.4}",
        k.gain, k.offset, k.transmission
    );
    println!("50 °C reads as {} counts", engine.temp_to_raw(50.0));
    Ok(())
}
