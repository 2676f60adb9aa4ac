//! Scenario session controller: playback-then-input trial lifecycle on top of
//! the timer queue and the adaptive generator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};

use tonespan_audio::{silence, slider_gain, synthesize, PlaybackSink, ATTACK_MS, HOLD_MS, STIMULUS_MS};
use tonespan_core::{ScenarioPhase, TrialRecord, GRID_SIZE};
use tonespan_timing::TimerQueue;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::generate::next_trial;
use crate::trial::Scenario;

/// Narrow presentation interface. The controller never touches widget state
/// directly; whichever presentation layer exists implements this.
pub trait SessionView {
    /// Highlight the pressed/played grid slot. The controller schedules the
    /// matching [`SessionView::stimulus_clear`] itself.
    fn stimulus_effect(&mut self, index: usize);
    fn stimulus_clear(&mut self, index: usize);
    fn set_label(&mut self, text: &str);
    fn show_buttons(&mut self);
    fn hide_buttons(&mut self);
    fn show_closing(&mut self);
}

/// Durable trial-record storage. `append` runs once per judged trial;
/// `rewrite` replaces the whole destination from in-memory history at session
/// end and must produce rows identical to the cumulative appends.
pub trait ResultsRecorder {
    fn append(&mut self, record: &TrialRecord) -> Result<()>;
    fn rewrite(&mut self, records: &[TrialRecord]) -> Result<()>;
}

/// Timed continuations. Everything the session defers goes through the timer
/// queue as one of these, so all trial-state mutation happens inside
/// [`Session::tick`] or a direct input-event call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEvent {
    /// Demonstrate the next stimulus of the active trial's target.
    PlaybackStep { scenario: usize },
    /// Revert the visual highlight of one grid slot.
    StimulusClear { index: usize },
    /// End of the refractory lockout after an accepted press.
    ReenableInput,
    /// The full envelope after the last input has elapsed; judge the trial.
    JudgeTrial { scenario: usize },
}

/// Demonstration progress: which scenario is playing back and how far along
/// the target sequence it is. Advanced one step per scheduled event.
struct PlaybackCursor {
    scenario: usize,
    position: usize,
}

pub struct Session<R, V, S, W>
where
    R: Rng,
    V: SessionView,
    S: PlaybackSink,
    W: ResultsRecorder,
{
    pub config: SessionConfig,
    pub rng: R,
    pub view: V,
    pub sink: S,
    pub recorder: W,
    timers: TimerQueue<SessionEvent>,
    scenarios: Vec<Scenario>,
    /// Indices still waiting to be presented, reshuffled on every registration.
    pending_order: Vec<usize>,
    /// Indices in the order scenarios were first played; export follows this.
    activation_order: Vec<usize>,
    active: Option<usize>,
    playback: Option<PlaybackCursor>,
    input_enabled: bool,
    participant: String,
    closed: bool,
}

impl<R, V, S, W> Session<R, V, S, W>
where
    R: Rng,
    V: SessionView,
    S: PlaybackSink,
    W: ResultsRecorder,
{
    pub fn new(
        config: SessionConfig,
        rng: R,
        view: V,
        sink: S,
        recorder: W,
        participant: impl Into<String>,
    ) -> Self {
        Self {
            config,
            rng,
            view,
            sink,
            recorder,
            timers: TimerQueue::new(),
            scenarios: Vec::new(),
            pending_order: Vec::new(),
            activation_order: Vec::new(),
            active: None,
            playback: None,
            input_enabled: false,
            participant: participant.into(),
            closed: false,
        }
    }

    /// Register a scenario: nine tone frequencies, or `None` for the silence
    /// set. Waveforms are synthesized once here. Each registration reshuffles
    /// the whole presentation order.
    pub fn register_scenario(
        &mut self,
        name: &str,
        frequencies: Option<&[f32]>,
    ) -> Result<(), SessionError> {
        if self.scenarios.iter().any(|s| s.name == name) {
            return Err(SessionError::DuplicateScenario(name.to_string()));
        }
        let waveforms = match frequencies {
            Some(freqs) => {
                if freqs.len() != GRID_SIZE {
                    return Err(SessionError::StimulusCount {
                        name: name.to_string(),
                        expected: GRID_SIZE,
                        got: freqs.len(),
                    });
                }
                freqs
                    .iter()
                    .map(|&f| Arc::new(synthesize(f, self.config.sample_rate)))
                    .collect()
            }
            None => (0..GRID_SIZE).map(|_| Arc::new(silence())).collect(),
        };
        let index = self.scenarios.len();
        self.scenarios.push(Scenario::new(name.to_string(), waveforms));
        self.pending_order.push(index);
        self.pending_order.shuffle(&mut self.rng);
        debug!(scenario = name, "scenario registered");
        Ok(())
    }

    /// Activate the first scenario of the shuffled order.
    pub fn start(&mut self) -> Result<()> {
        if self.active.is_some() || self.closed {
            return Ok(());
        }
        self.advance_session()
    }

    /// Subject pressed the ready prompt: generate the next trial and start
    /// demonstrating its target sequence. Ignored unless the named scenario is
    /// the active one sitting in `Idle`.
    pub fn ready_pressed(&mut self, name: &str) {
        let Some(index) = self.expect_active(name, ScenarioPhase::Idle) else {
            return;
        };
        let trial_number = self.scenarios[index].history.len() + 1;
        let (trial, finishing) = next_trial(&self.scenarios[index].history, &mut self.rng);
        info!(
            scenario = name,
            trial = trial_number,
            length = trial.length(),
            finishing,
            "trial started"
        );
        let scenario = &mut self.scenarios[index];
        scenario.finishing = finishing;
        scenario.history.push(trial);
        scenario.phase = ScenarioPhase::Playing;
        self.view.show_buttons();
        self.input_enabled = false;
        self.playback = Some(PlaybackCursor {
            scenario: index,
            position: 0,
        });
        self.timers.schedule(
            self.config.inter_stimulus_delay(),
            SessionEvent::PlaybackStep { scenario: index },
        );
    }

    /// Subject pressed grid slot `index`. A no-op while playback is running or
    /// the input refractory lockout is in effect.
    pub fn stimulus_chosen(&mut self, name: &str, index: usize) {
        if index >= GRID_SIZE {
            return;
        }
        let Some(scenario_index) = self.expect_active(name, ScenarioPhase::AwaitingInput) else {
            return;
        };
        if !self.input_enabled || self.playback.is_some() {
            debug!(scenario = name, index, "input ignored");
            return;
        }
        self.input_enabled = false;
        self.fire_effect(scenario_index, index);

        let scenario = &mut self.scenarios[scenario_index];
        let Some(trial) = scenario.history.last_mut() else {
            return;
        };
        trial.record_input(index);
        if trial.is_complete() {
            // Judge once the last stimulus has fully sounded out.
            self.timers.schedule(
                Duration::from_millis(STIMULUS_MS),
                SessionEvent::JudgeTrial {
                    scenario: scenario_index,
                },
            );
        } else {
            self.timers
                .schedule(self.config.refractory_delay(), SessionEvent::ReenableInput);
        }
    }

    /// Advance the timer queue by one quantum and handle everything that came
    /// due. The external driver must call this periodically for the program
    /// lifetime.
    pub fn tick(&mut self, quantum: Duration) -> Result<()> {
        for event in self.timers.tick(quantum) {
            self.handle_event(event)?;
        }
        Ok(())
    }

    fn handle_event(&mut self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::PlaybackStep { scenario } => {
                self.playback_step(scenario);
                Ok(())
            }
            SessionEvent::StimulusClear { index } => {
                self.view.stimulus_clear(index);
                Ok(())
            }
            SessionEvent::ReenableInput => {
                if self.playback.is_none() {
                    self.input_enabled = true;
                }
                Ok(())
            }
            SessionEvent::JudgeTrial { scenario } => self.judge_trial(scenario),
        }
    }

    fn playback_step(&mut self, scenario: usize) {
        let position = match &self.playback {
            Some(cursor) if cursor.scenario == scenario => cursor.position,
            _ => return,
        };
        let step = self.scenarios[scenario]
            .current_trial()
            .and_then(|t| t.target.get(position).copied());
        match step {
            Some(stimulus) => {
                if let Some(cursor) = self.playback.as_mut() {
                    cursor.position += 1;
                }
                self.fire_effect(scenario, stimulus);
                self.timers.schedule(
                    self.config.inter_stimulus_delay(),
                    SessionEvent::PlaybackStep { scenario },
                );
            }
            None => {
                // One step past the last stimulus: demonstration over, the
                // subject may answer.
                self.playback = None;
                self.input_enabled = true;
                self.scenarios[scenario].phase = ScenarioPhase::AwaitingInput;
                debug!(scenario = %self.scenarios[scenario].name, "playback complete");
            }
        }
    }

    fn judge_trial(&mut self, scenario: usize) -> Result<()> {
        let record = {
            let s = &mut self.scenarios[scenario];
            if s.phase != ScenarioPhase::AwaitingInput {
                return Ok(());
            }
            s.phase = ScenarioPhase::Judged;
            let Some(trial) = s.history.last() else {
                return Ok(());
            };
            TrialRecord {
                participant: self.participant.clone(),
                scenario: s.name.clone(),
                trial_number: s.history.len(),
                length: trial.length(),
                correct: trial.is_correct(),
            }
        };
        self.recorder.append(&record)?;
        info!(
            scenario = %record.scenario,
            trial = record.trial_number,
            length = record.length,
            correct = record.correct,
            "trial judged"
        );

        let s = &mut self.scenarios[scenario];
        if s.finishing {
            s.finishing = false;
            s.phase = ScenarioPhase::Complete;
            self.advance_session()?;
        } else {
            s.phase = ScenarioPhase::Idle;
        }
        self.view.hide_buttons();
        Ok(())
    }

    fn advance_session(&mut self) -> Result<()> {
        if self.pending_order.is_empty() {
            let records = self.records();
            self.recorder.rewrite(&records)?;
            self.view.show_closing();
            self.active = None;
            self.closed = true;
            info!(trials = records.len(), "session complete");
            return Ok(());
        }
        let index = self.pending_order.remove(0);
        self.activation_order.push(index);
        self.active = Some(index);
        let label = format!(
            "{} ({} / {})",
            capitalize(&self.scenarios[index].name),
            self.activation_order.len(),
            self.scenarios.len()
        );
        self.view.set_label(&label);
        self.view.hide_buttons();
        info!(scenario = %self.scenarios[index].name, "scenario started");
        Ok(())
    }

    /// Audio plus visual effect for one grid slot, with the highlight revert
    /// scheduled for when the tone's sustain ends.
    fn fire_effect(&mut self, scenario: usize, index: usize) {
        let wave = Arc::clone(&self.scenarios[scenario].waveforms[index]);
        self.sink.play(wave, slider_gain(self.config.volume));
        self.view.stimulus_effect(index);
        self.timers.schedule(
            Duration::from_millis(ATTACK_MS + HOLD_MS),
            SessionEvent::StimulusClear { index },
        );
    }

    /// Index of the active scenario if it matches `name` and sits in `phase`.
    fn expect_active(&self, name: &str, phase: ScenarioPhase) -> Option<usize> {
        let index = self.active?;
        let scenario = &self.scenarios[index];
        if scenario.name == name && scenario.phase == phase {
            Some(index)
        } else {
            debug!(scenario = name, ?phase, "event out of window");
            None
        }
    }

    /// All records derivable from history, scenarios in activation order,
    /// trials chronological. The rewrite path and the cumulative appends
    /// produce identical rows.
    pub fn records(&self) -> Vec<TrialRecord> {
        let mut rows = Vec::new();
        for &index in &self.activation_order {
            let scenario = &self.scenarios[index];
            for (n, trial) in scenario.history.iter().enumerate() {
                rows.push(TrialRecord {
                    participant: self.participant.clone(),
                    scenario: scenario.name.clone(),
                    trial_number: n + 1,
                    length: trial.length(),
                    correct: trial.is_correct(),
                });
            }
        }
        rows
    }

    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    pub fn active_scenario(&self) -> Option<&Scenario> {
        self.active.map(|index| &self.scenarios[index])
    }

    pub fn phase(&self, name: &str) -> Option<ScenarioPhase> {
        self.scenario(name).map(|s| s.phase)
    }

    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// True once every scenario has completed and the closing screen is up.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn participant(&self) -> &str {
        &self.participant
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
