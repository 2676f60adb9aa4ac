use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;

use tonespan_audio::NullSink;
use tonespan_core::{ScenarioPhase, TrialRecord, GRID_SIZE, HARMONIC_FREQUENCIES, UNRELATED_FREQUENCIES};
use tonespan_session::{ResultsRecorder, Session, SessionConfig, SessionError, SessionView};

const TICK: Duration = Duration::from_millis(20);

#[derive(Default)]
struct TestView {
    effects: Vec<usize>,
    clears: Vec<usize>,
    labels: Vec<String>,
    buttons_visible: bool,
    closing: bool,
}

impl SessionView for TestView {
    fn stimulus_effect(&mut self, index: usize) {
        self.effects.push(index);
    }
    fn stimulus_clear(&mut self, index: usize) {
        self.clears.push(index);
    }
    fn set_label(&mut self, text: &str) {
        self.labels.push(text.to_string());
    }
    fn show_buttons(&mut self) {
        self.buttons_visible = true;
    }
    fn hide_buttons(&mut self) {
        self.buttons_visible = false;
    }
    fn show_closing(&mut self) {
        self.closing = true;
    }
}

#[derive(Default)]
struct MemoryRecorder {
    appended: Vec<TrialRecord>,
    rewritten: Option<Vec<TrialRecord>>,
}

impl ResultsRecorder for MemoryRecorder {
    fn append(&mut self, record: &TrialRecord) -> Result<()> {
        self.appended.push(record.clone());
        Ok(())
    }
    fn rewrite(&mut self, records: &[TrialRecord]) -> Result<()> {
        self.rewritten = Some(records.to_vec());
        Ok(())
    }
}

type TestSession = Session<StdRng, TestView, NullSink, MemoryRecorder>;

fn session(seed: u64) -> TestSession {
    Session::new(
        SessionConfig::default(),
        StdRng::seed_from_u64(seed),
        TestView::default(),
        NullSink,
        MemoryRecorder::default(),
        "p01",
    )
}

fn advance(session: &mut TestSession, ms: u64) {
    for _ in 0..ms / 20 {
        session.tick(TICK).expect("tick");
    }
}

fn current_target(session: &TestSession, name: &str) -> Vec<usize> {
    session
        .scenario(name)
        .expect("scenario")
        .current_trial()
        .expect("active trial")
        .target
        .clone()
}

/// Press ready and tick through the whole demonstration.
fn run_playback(session: &mut TestSession, name: &str) {
    session.ready_pressed(name);
    assert_eq!(session.phase(name), Some(ScenarioPhase::Playing));
    let length = current_target(session, name).len() as u64;
    advance(session, 500 * (length + 1));
    assert_eq!(session.phase(name), Some(ScenarioPhase::AwaitingInput));
}

/// Enter the given sequence, respecting the refractory lockout, and tick
/// through judging.
fn answer(session: &mut TestSession, name: &str, inputs: &[usize]) {
    for (n, &index) in inputs.iter().enumerate() {
        session.stimulus_chosen(name, index);
        if n + 1 < inputs.len() {
            advance(session, 100);
        }
    }
    advance(session, 500);
}

fn answer_correctly(session: &mut TestSession, name: &str) {
    let target = current_target(session, name);
    answer(session, name, &target);
}

fn answer_wrongly(session: &mut TestSession, name: &str) {
    let wrong: Vec<usize> = current_target(session, name)
        .iter()
        .map(|&i| (i + 1) % GRID_SIZE)
        .collect();
    answer(session, name, &wrong);
}

/// Fail every trial until the scenario completes; returns trials run.
fn fail_out(session: &mut TestSession, name: &str) -> usize {
    let mut trials = 0;
    while session.phase(name) != Some(ScenarioPhase::Complete) {
        run_playback(session, name);
        answer_wrongly(session, name);
        trials += 1;
        assert!(trials <= 10, "scenario never completed");
    }
    trials
}

#[test]
fn demonstration_runs_before_input_opens() {
    let mut s = session(1);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();
    assert_eq!(s.phase("harmonic"), Some(ScenarioPhase::Idle));
    assert_eq!(s.view.labels, vec!["Harmonic (1 / 1)"]);

    s.ready_pressed("harmonic");
    let target = current_target(&s, "harmonic");
    assert_eq!(target.len(), 1);

    // Input during playback is a no-op.
    s.stimulus_chosen("harmonic", target[0]);
    assert!(s.scenario("harmonic").unwrap().current_trial().unwrap().observed.is_empty());

    advance(&mut s, 1000);
    assert_eq!(s.phase("harmonic"), Some(ScenarioPhase::AwaitingInput));
    assert!(s.input_enabled());
    // The demonstration fired exactly the target sequence.
    assert_eq!(s.view.effects, target);
}

#[test]
fn correct_trial_is_recorded_and_grows_the_next() {
    let mut s = session(2);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();

    run_playback(&mut s, "harmonic");
    answer_correctly(&mut s, "harmonic");

    assert_eq!(s.phase("harmonic"), Some(ScenarioPhase::Idle));
    let records = &s.recorder.appended;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].trial_number, 1);
    assert_eq!(records[0].length, 1);
    assert!(records[0].correct);
    assert_eq!(records[0].scenario, "harmonic");
    assert_eq!(records[0].participant, "p01");

    run_playback(&mut s, "harmonic");
    assert_eq!(current_target(&s, "harmonic").len(), 2);
}

#[test]
fn observed_never_exceeds_target_length() {
    let mut s = session(3);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();
    run_playback(&mut s, "harmonic");

    let target = current_target(&s, "harmonic");
    s.stimulus_chosen("harmonic", target[0]);
    // Trial complete; further presses before judging must be swallowed.
    s.stimulus_chosen("harmonic", 0);
    advance(&mut s, 100);
    s.stimulus_chosen("harmonic", 0);
    advance(&mut s, 400);

    assert_eq!(s.recorder.appended.len(), 1);
    let scenario = s.scenario("harmonic").unwrap();
    assert_eq!(scenario.history[0].observed.len(), target.len());
}

#[test]
fn refractory_lockout_swallows_rapid_presses() {
    let mut s = session(4);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();
    // Grow to a length-2 trial first.
    run_playback(&mut s, "harmonic");
    answer_correctly(&mut s, "harmonic");
    run_playback(&mut s, "harmonic");

    s.stimulus_chosen("harmonic", 0);
    s.stimulus_chosen("harmonic", 1);
    let observed = s.scenario("harmonic").unwrap().current_trial().unwrap().observed.clone();
    assert_eq!(observed, vec![0], "second press must fall in the lockout");

    advance(&mut s, 100);
    s.stimulus_chosen("harmonic", 1);
    let observed = s.scenario("harmonic").unwrap().current_trial().unwrap().observed.clone();
    assert_eq!(observed, vec![0, 1]);
}

#[test]
fn events_for_wrong_phase_or_unknown_scenario_are_ignored() {
    let mut s = session(5);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();

    s.stimulus_chosen("harmonic", 0);
    s.stimulus_chosen("nonesuch", 0);
    s.ready_pressed("nonesuch");
    assert!(s.scenario("harmonic").unwrap().history.is_empty());

    run_playback(&mut s, "harmonic");
    // Ready during AwaitingInput must not spawn a second active trial.
    s.ready_pressed("harmonic");
    assert_eq!(s.scenario("harmonic").unwrap().history.len(), 1);
}

#[test]
fn all_correct_scenario_keeps_growing_and_never_finishes() {
    let mut s = session(6);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.start().unwrap();

    for expected_length in 1..=8 {
        run_playback(&mut s, "harmonic");
        assert_eq!(current_target(&s, "harmonic").len(), expected_length);
        answer_correctly(&mut s, "harmonic");
        assert_eq!(s.phase("harmonic"), Some(ScenarioPhase::Idle));
    }
    assert!(!s.scenario("harmonic").unwrap().finishing);
    assert!(!s.is_closed());
}

#[test]
fn three_failures_at_one_length_finish_after_one_more_trial() {
    let mut s = session(7);
    s.register_scenario("silent", None).unwrap();
    s.start().unwrap();

    let trials = fail_out(&mut s, "silent");
    // Threshold crossed generating trial 4; that trial still runs.
    assert_eq!(trials, 4);
    assert_eq!(s.recorder.appended.len(), 4);
    assert!(s.recorder.appended.iter().all(|r| r.length == 1 && !r.correct));
    assert!(s.is_closed());
    assert!(s.view.closing);
}

#[test]
fn rewrite_rows_match_cumulative_appends() {
    let mut s = session(8);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.register_scenario("unrelated", Some(&UNRELATED_FREQUENCIES)).unwrap();
    s.start().unwrap();

    for _ in 0..2 {
        let name = s.active_scenario().expect("active scenario").name.clone();
        fail_out(&mut s, &name);
    }

    assert!(s.is_closed());
    let rewritten = s.recorder.rewritten.as_ref().expect("rewrite at session end");
    assert_eq!(rewritten, &s.recorder.appended);
    assert_eq!(rewritten, &s.records());
}

#[test]
fn session_advances_only_after_complete() {
    let mut s = session(9);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    s.register_scenario("unrelated", Some(&UNRELATED_FREQUENCIES)).unwrap();
    s.start().unwrap();

    let first = s.active_scenario().unwrap().name.clone();
    let second = if first == "harmonic" { "unrelated" } else { "harmonic" };

    // A judged-but-continuing trial does not advance the session.
    run_playback(&mut s, &first);
    answer_correctly(&mut s, &first);
    assert_eq!(s.active_scenario().unwrap().name, first);
    assert_eq!(s.phase(second), Some(ScenarioPhase::Idle));

    fail_out(&mut s, &first);
    assert_eq!(s.active_scenario().unwrap().name, second);
    assert_eq!(s.view.labels.last().unwrap(), &format!(
        "{}{} (2 / 2)",
        second[..1].to_uppercase(),
        &second[1..]
    ));
}

#[test]
fn silence_scenario_uses_single_zero_sample_waveforms() {
    let mut s = session(10);
    s.register_scenario("silent", None).unwrap();
    let scenario = s.scenario("silent").unwrap();
    assert_eq!(scenario.waveforms.len(), GRID_SIZE);
    assert!(scenario.waveforms.iter().all(|w| w.as_ref() == &vec![0.0]));
}

#[test]
fn registration_rejects_bad_configurations() {
    let mut s = session(11);
    s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)).unwrap();
    assert!(matches!(
        s.register_scenario("harmonic", Some(&HARMONIC_FREQUENCIES)),
        Err(SessionError::DuplicateScenario(_))
    ));
    assert!(matches!(
        s.register_scenario("short", Some(&[440.0, 550.0])),
        Err(SessionError::StimulusCount { got: 2, .. })
    ));
}
