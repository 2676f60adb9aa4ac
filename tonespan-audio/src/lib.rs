pub mod sink;
pub mod synth;

pub use sink::{slider_gain, CpalSink, NullSink, PlaybackSink, Waveform};
pub use synth::{silence, synthesize, ATTACK_MS, HOLD_MS, RELEASE_MS, STIMULUS_MS};
