//! Synthetic sensor readings.
//!
//! Pure value generation for input-direction components. No real hardware is
//! sensed; any source of randomness is good enough for simulation.

use rand::Rng;

/// Draw one plausible reading: uniform in `[10.0, 20.0)`, rendered with
/// exactly two fractional digits as the cloud service expects.
pub fn synthesize_reading() -> String {
    format_reading(rand::thread_rng().gen_range(10.0..20.0))
}

fn format_reading(value: f64) -> String {
    format!("{value:.2}")
}
