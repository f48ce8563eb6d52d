//! Core domain types for IMEI Hunter.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

mod error;
mod imei;
mod outcome;
mod session;

pub use error::{SERVICE_UNREACHABLE, ServiceError, ServiceErrorKind, ValidationError};
pub use imei::Imei;
pub use outcome::{Branch, Outcome, SolveResult, Verdict, select_branch};
pub use session::{ChallengeAttempt, ChallengeImage, DataUri, Session, SessionId};
