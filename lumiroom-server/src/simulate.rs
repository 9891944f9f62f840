use rand::Rng;
use time::Time;

const NIGHT: f64 = 10.0;
const MIDDAY: f64 = 100.0;
const AFTERNOON: f64 = 60.0;
const EVENING: f64 = 30.0;

/// Brightness in percent following a day curve, dim at night, brightest at
/// midday and dimming toward evening.
///
/// ```text
///  0-6   10          flat
///  6-8   10 → 100    ramp
///  8-13  100         flat
/// 13-18  60          flat
/// 18-20  60 → 0      ramp
/// 20-22  30          flat
/// 22-24  30 → 0      ramp, wraps to the night flat
/// ```
///
/// Ramps interpolate on the minute and the result is truncated.
pub fn diurnal_brightness(time: Time) -> u8 {
    let hour = time.hour();
    let hours = hour as f64 + time.minute() as f64 / 60.0;

    let brightness = match hour {
        0..=5 => NIGHT,
        6..=7 => ramp(hours, 6.0, NIGHT, MIDDAY),
        8..=12 => MIDDAY,
        13..=17 => AFTERNOON,
        18..=19 => ramp(hours, 18.0, AFTERNOON, 0.0),
        20..=21 => EVENING,
        _ => ramp(hours, 22.0, EVENING, 0.0),
    };

    brightness.clamp(0.0, 100.0) as u8
}

/// Linear interpolation over a two hour segment starting at `start`.
fn ramp(hours: f64, start: f64, from: f64, to: f64) -> f64 {
    let progress = (hours - start) / 2.0;

    from + (to - from) * progress
}

/// Uniform brightness in `0..=100`.
pub fn random_brightness<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(0..=100)
}
