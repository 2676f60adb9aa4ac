/// Number of slots on the stimulus grid (fixed 3×3 layout, indices 0–8).
pub const GRID_SIZE: usize = 9;

/// Output sample rate for synthesized stimuli.
pub const SAMPLE_RATE: u32 = 48_000;

/// Harmonically related tone set (C major scale degrees around middle C).
pub const HARMONIC_FREQUENCIES: [f32; GRID_SIZE] = [
    261.63, 293.66, 329.63, 392.00, 440.00, 523.25, 587.33, 659.25, 783.99,
];

/// Harmonically unrelated tone set covering a similar register.
pub const UNRELATED_FREQUENCIES: [f32; GRID_SIZE] = [
    227.0, 317.0, 354.0, 407.0, 463.0, 539.0, 569.0, 747.0, 823.0,
];
