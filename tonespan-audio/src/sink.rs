//! Fire-and-forget playback of prepared waveforms.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

/// A prepared mono waveform, shared between the session and the audio thread.
pub type Waveform = Arc<Vec<f32>>;

/// Maps the subject-facing volume setting [0, 100] to a linear gain.
///
/// Exponential curve from 0.0 at 0 to 0.99 at 100; evaluated once per playback
/// invocation, not during playback.
pub fn slider_gain(volume: u8) -> f32 {
    100.0f32.powf(volume as f32 / 100.0 - 1.0) - 0.01
}

/// Plays a waveform at the given gain without blocking and without being
/// awaited. Overlapping plays are allowed to overlap freely.
pub trait PlaybackSink {
    fn play(&mut self, samples: Waveform, gain: f32);
}

/// Sink that discards everything. For tests and headless runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl PlaybackSink for NullSink {
    fn play(&mut self, _samples: Waveform, _gain: f32) {}
}

struct Voice {
    samples: Waveform,
    gain: f32,
    position: usize,
}

/// cpal-backed sink. One output stream runs for the whole session; `play`
/// pushes a voice onto a shared list and the stream callback mixes all live
/// voices additively, duplicating the mono signal across output channels.
pub struct CpalSink {
    voices: Arc<Mutex<Vec<Voice>>>,
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Open the default output device at `sample_rate`. The stream starts
    /// immediately so the first real playback does not pay device spin-up.
    pub fn new(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no audio output device available"))?;
        let channels = device
            .default_output_config()
            .context("querying default output config")?
            .channels() as usize;
        let config = cpal::StreamConfig {
            channels: channels as u16,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let voices: Arc<Mutex<Vec<Voice>>> = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&voices);
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    data.fill(0.0);
                    let Ok(mut voices) = shared.lock() else {
                        return;
                    };
                    let frames = data.len() / channels;
                    for voice in voices.iter_mut() {
                        let remaining = voice.samples.len().saturating_sub(voice.position);
                        for frame in 0..frames.min(remaining) {
                            let sample = voice.samples[voice.position + frame] * voice.gain;
                            for ch in 0..channels {
                                data[frame * channels + ch] += sample;
                            }
                        }
                        voice.position += frames;
                    }
                    voices.retain(|v| v.position < v.samples.len());
                },
                |err| warn!("audio stream error: {err}"),
                None,
            )
            .context("building output stream")?;
        stream.play().context("starting output stream")?;
        info!(sample_rate, channels, "audio output running");

        Ok(Self {
            voices,
            _stream: stream,
        })
    }
}

impl PlaybackSink for CpalSink {
    fn play(&mut self, samples: Waveform, gain: f32) {
        if let Ok(mut voices) = self.voices.lock() {
            voices.push(Voice {
                samples,
                gain,
                position: 0,
            });
        }
    }
}
