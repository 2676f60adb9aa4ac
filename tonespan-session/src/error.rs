use thiserror::Error;

/// Configuration-time errors. Runtime subject input is never an error: out of
/// window or duplicate input is silently ignored.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("scenario '{name}' requires {expected} stimulus frequencies, got {got}")]
    StimulusCount {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("scenario '{0}' is already registered")]
    DuplicateScenario(String),
}
