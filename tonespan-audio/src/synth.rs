//! Band-limited sawtooth stimulus synthesis.

use std::f32::consts::PI;

/// Number of sine harmonics summed into the sawtooth.
pub const HARMONICS_N: usize = 10;

pub const ATTACK_MS: u64 = 50;
pub const HOLD_MS: u64 = 200;
pub const RELEASE_MS: u64 = 250;

/// Total length of one stimulus, envelope included.
pub const STIMULUS_MS: u64 = ATTACK_MS + HOLD_MS + RELEASE_MS;

fn sample_count(length_ms: u64, sample_rate: u32) -> usize {
    (length_ms as f64 / 1000.0 * sample_rate as f64) as usize
}

/// Render one enveloped beep at `frequency_hz`.
///
/// The waveform is the first [`HARMONICS_N`] harmonics of a sawtooth
/// (`sin(2π·f·k·t)/k`, scaled by 2/π) under a three-part envelope: cubic
/// ease-in attack, constant hold, raised-cosine release. Deterministic for
/// identical inputs.
pub fn synthesize(frequency_hz: f32, sample_rate: u32) -> Vec<f32> {
    let total = sample_count(STIMULUS_MS, sample_rate);
    let mut wave = vec![0.0f32; total];
    for k in 1..=HARMONICS_N {
        let omega = 2.0 * PI * frequency_hz * k as f32;
        for (n, sample) in wave.iter_mut().enumerate() {
            let t = n as f32 / sample_rate as f32;
            *sample += (omega * t).sin() / k as f32;
        }
    }
    for sample in wave.iter_mut() {
        *sample *= 2.0 / PI;
    }

    let attack = sample_count(ATTACK_MS, sample_rate);
    let hold = sample_count(HOLD_MS, sample_rate);
    // Release takes whatever remains so the segments always sum to `total`.
    let release = total - attack - hold;

    for n in 0..attack {
        let x = n as f32 / attack as f32;
        wave[n] *= 1.0 - (1.0 - x).powi(3);
    }
    for n in 0..release {
        let x = 1.0 - n as f32 / release as f32;
        wave[attack + hold + n] *= 1.0 - (x * PI / 2.0).cos();
    }

    wave
}

/// The silence stimulus: a single zero sample.
pub fn silence() -> Vec<f32> {
    vec![0.0]
}
