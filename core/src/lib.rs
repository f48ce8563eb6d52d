//! Verification flow for IMEI Hunter.
//!
//! [`VerificationSession`] walks one user from an identifier to a verdict:
//! start a session with the lookup service, answer its challenge until the
//! service accepts the text, then pick the follow-up branch for the verdict.
//! Transport lives behind [`imei_client::LookupService`], so the flow runs
//! unchanged against the HTTP client or a test double.

mod session;
mod state;

pub use session::{SessionError, VerificationSession};
pub use state::{Dispatch, PendingChallenge, Phase, Resolution, SessionState, SubmitOutcome};

pub use imei_types::{
    Branch, ChallengeAttempt, ChallengeImage, Imei, Outcome, ServiceError, Session, SessionId,
    ValidationError, Verdict, select_branch,
};
