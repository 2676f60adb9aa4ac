use std::time::Duration;

use tonespan_core::SAMPLE_RATE;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sample_rate: u32,
    /// Subject-facing volume setting, 0–100.
    pub volume: u8,
    /// Gap between demonstrated stimuli during playback.
    pub inter_stimulus_ms: u64,
    /// Input lockout after each accepted press.
    pub refractory_ms: u64,
    /// Quantum the external driver is expected to tick at.
    pub tick_quantum_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            volume: 80,
            inter_stimulus_ms: 500,
            refractory_ms: 100,
            tick_quantum_ms: 20,
        }
    }
}

impl SessionConfig {
    pub fn inter_stimulus_delay(&self) -> Duration {
        Duration::from_millis(self.inter_stimulus_ms)
    }

    pub fn refractory_delay(&self) -> Duration {
        Duration::from_millis(self.refractory_ms)
    }

    pub fn tick_quantum(&self) -> Duration {
        Duration::from_millis(self.tick_quantum_ms)
    }
}
