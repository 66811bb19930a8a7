//! Pure wave and noise functions used by the shape generators.
//!
//! Nothing here holds state or draws randomness: identical inputs always
//! produce bit-identical outputs.

use std::f32::consts::TAU;

/// Octave table: (weight, spatial multiplier x, spatial multiplier y, time multiplier, phase).
///
/// Frequencies are deliberately non-integer ratios of each other so that the
/// summed outline never visibly repeats around the ring.
const OCTAVES: [(f32, f32, f32, f32, f32); 4] = [
    (0.5, 1.0, 1.0, 1.0, 0.0),
    (0.25, 2.13, 1.87, 1.31, 1.7),
    (0.125, 4.37, 3.71, -1.73, 3.1),
    (0.0625, 8.11, 7.43, 2.29, 4.6),
];

const OCTAVE_WEIGHT_SUM: f32 = 0.5 + 0.25 + 0.125 + 0.0625;

/// Exponent and scale of the waveform edge attenuation.
pub const ATTENUATION_K: f32 = 4.0;

/// Multi-octave noise sampled on a ring.
///
/// The sample point is `(cos θ · frequency, sin θ · frequency, time · speed)`
/// and the result is normalised to `[-1, 1]`.
pub fn ring_noise(angle: f32, time: f32, frequency: f32, speed: f32) -> f32 {
    let x = angle.cos() * frequency;
    let y = angle.sin() * frequency;
    let z = time * speed;

    let sum: f32 = OCTAVES
        .iter()
        .map(|&(weight, fx, fy, ft, phase)| {
            weight * (x * fx + z * ft + phase).sin() * (y * fy - z * ft * 0.7 + phase * 0.5).cos()
        })
        .sum();

    (sum / OCTAVE_WEIGHT_SUM).clamp(-1.0, 1.0)
}

/// Symmetric bump: 1 at `width / 2`, close to 0 at `0` and `width`.
///
/// `u = 2 · (2x / width − 1)` spans `[-2, 2]` and the falloff is
/// `(K / (K + |u|^K))^K` with `K = 4`, giving `≈ 0.0016` at the edges.
/// A non-positive or non-finite width yields 0.
pub fn attenuate(x: f32, width: f32) -> f32 {
    if width <= 0.0 || !width.is_finite() || !x.is_finite() {
        return 0.0;
    }

    let u = (2.0 * (2.0 * x / width - 1.0)).abs();
    (ATTENUATION_K / (ATTENUATION_K + u.powf(ATTENUATION_K))).powf(ATTENUATION_K)
}

/// One sine sample of a travelling wave across a normalised `[0, 1]` span.
pub fn wave_sample(normalized_x: f32, frequency: f32, phase: f32) -> f32 {
    (normalized_x * TAU * frequency + phase).sin()
}
