pub mod config;
pub mod error;
pub mod generate;
pub mod session;
pub mod trial;

pub use config::SessionConfig;
pub use error::SessionError;
pub use generate::{next_trial, FAILURE_LIMIT};
pub use session::{ResultsRecorder, Session, SessionView};
pub use trial::{Scenario, Trial};
