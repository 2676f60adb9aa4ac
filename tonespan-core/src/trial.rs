use serde::{Deserialize, Serialize};

/// Scenario state machine phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioPhase {
    /// Showing the ready prompt, waiting for the subject.
    Idle,
    /// Demonstrating the target sequence; input is locked.
    Playing,
    /// Subject is entering the sequence.
    AwaitingInput,
    /// Trial fully entered, outcome recorded.
    Judged,
    /// Scenario exhausted; no further trials will run.
    Complete,
}

/// One exported row per judged trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub participant: String,
    pub scenario: String,
    /// 1-based position within the scenario.
    pub trial_number: usize,
    pub length: usize,
    pub correct: bool,
}
