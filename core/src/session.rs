//! The verification session state machine.
//!
//! ```text
//! Idle --begin--> AwaitingChallenge --submit--> AwaitingResult --verdict--> Resolved
//!                        ^                            |
//!                        +---- retry / service error -+
//!
//! reset: any state --> Idle
//! ```
//!
//! One request at a time: a transition that needs the lookup service marks
//! the session busy for its duration, and overlapping calls return
//! [`Dispatch::Ignored`] without touching the network. `reset()` starts a new
//! epoch; a request from an older epoch completes as [`Dispatch::Superseded`]
//! and leaves the state alone.

use std::sync::{Mutex, MutexGuard, PoisonError};

use imei_client::LookupService;
use imei_types::{
    Branch, ChallengeAttempt, Imei, ServiceError, Session, SessionId, SolveResult,
    ValidationError,
};
use thiserror::Error;

use crate::state::{Dispatch, PendingChallenge, Phase, Resolution, SessionState, SubmitOutcome};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    epoch: u64,
    /// Epoch of the request currently in flight.
    in_flight: Option<u64>,
}

impl Inner {
    /// Move the pending challenge out, leaving `Idle`. Any other state stays put.
    fn take_challenge(&mut self) -> Option<PendingChallenge> {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::AwaitingChallenge(challenge) => Some(challenge),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Put an unanswered `AwaitingResult` back to `AwaitingChallenge`.
    fn reopen_challenge(&mut self) {
        match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::AwaitingResult { challenge, .. } => {
                self.state = SessionState::AwaitingChallenge(challenge);
            }
            other => self.state = other,
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The in-flight mark of one request.
///
/// Dropped without [`Flight::land`] (the caller abandoned the request
/// future), it clears the mark and reopens the challenge, unless a reset
/// already started a new epoch.
struct Flight<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
    landed: bool,
}

impl<'a> Flight<'a> {
    fn takeoff(inner: &'a Mutex<Inner>, guard: &mut Inner) -> Self {
        let epoch = guard.epoch;
        guard.in_flight = Some(epoch);
        Self {
            inner,
            epoch,
            landed: false,
        }
    }

    /// Clear the mark and hand back the state, or `None` if a reset superseded the request.
    fn land(mut self) -> Option<MutexGuard<'a, Inner>> {
        self.landed = true;
        let mut guard = lock(self.inner);
        if guard.epoch != self.epoch {
            return None;
        }
        guard.in_flight = None;
        Some(guard)
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if self.landed {
            return;
        }
        let mut guard = lock(self.inner);
        if guard.epoch != self.epoch {
            return;
        }
        guard.in_flight = None;
        guard.reopen_challenge();
        tracing::debug!(
            phase = guard.state.phase().as_str(),
            "Request abandoned before completion"
        );
    }
}

/// One user's walk through the verification flow.
///
/// Instances share nothing; run one per user interaction.
#[derive(Debug)]
pub struct VerificationSession<S> {
    service: S,
    inner: Mutex<Inner>,
}

impl<S> VerificationSession<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                epoch: 0,
                in_flight: None,
            }),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.lock().state.clone()
    }

    pub fn phase(&self) -> Phase {
        self.lock().state.phase()
    }

    /// True while a request to the lookup service is outstanding.
    pub fn is_busy(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn branch(&self) -> Option<Branch> {
        self.lock().state.branch()
    }

    /// Stage challenge text without submitting it.
    ///
    /// Returns `false` (and changes nothing) unless a challenge is awaiting an answer.
    pub fn edit_attempt(&self, text: &str) -> bool {
        let mut inner = self.lock();
        match &mut inner.state {
            SessionState::AwaitingChallenge(challenge) => {
                text.clone_into(&mut challenge.draft);
                true
            }
            _ => false,
        }
    }

    /// Discard everything and return to `Idle`. Never touches the network.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let previous = inner.state.phase();
        inner.epoch = inner.epoch.wrapping_add(1);
        if inner.in_flight.take().is_some() {
            tracing::debug!("Reset superseded an in-flight request");
        }
        inner.state = SessionState::Idle;
        tracing::debug!(from = previous.as_str(), "Verification session reset");
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock(&self.inner)
    }
}

impl<S: LookupService> VerificationSession<S> {
    /// Start a session for `identifier` and fetch its challenge.
    ///
    /// The identifier is checked locally first; a malformed one never reaches
    /// the service. On a service error the session stays `Idle`. Dropping the
    /// returned future before it completes releases the session.
    pub async fn begin(&self, identifier: &str) -> Result<Dispatch<Session>, SessionError> {
        let (imei, flight) = {
            let mut inner = self.lock();
            if inner.in_flight.is_some() {
                tracing::debug!("Ignoring begin while a request is in flight");
                return Ok(Dispatch::Ignored);
            }
            if !matches!(inner.state, SessionState::Idle) {
                return Err(ValidationError::SessionActive.into());
            }
            let imei = Imei::parse(identifier)?;
            let flight = Flight::takeoff(&self.inner, &mut inner);
            (imei, flight)
        };

        let result = self.service.start(&imei).await;

        let Some(mut inner) = flight.land() else {
            tracing::debug!(imei = %imei.masked(), "Discarding start result after reset");
            return Ok(Dispatch::Superseded);
        };

        match result {
            Ok(session) => {
                tracing::info!(
                    imei = %imei.masked(),
                    session_id = %session.id(),
                    "Challenge received"
                );
                inner.state =
                    SessionState::AwaitingChallenge(PendingChallenge::new(imei, session.clone()));
                Ok(Dispatch::Completed(session))
            }
            Err(err) => {
                tracing::warn!(imei = %imei.masked(), error = %err, "Failed to start session");
                Err(err.into())
            }
        }
    }

    /// Answer the challenge of the active session.
    ///
    /// A `retry` answer keeps the same session and image and counts a
    /// rejection. A service error also returns to `AwaitingChallenge` so the
    /// user can try again. The staged draft is cleared either way.
    ///
    /// The text sent is `attempt_text` with surrounding whitespace trimmed.
    /// Dropping the returned future before it completes reopens the challenge.
    pub async fn submit_challenge(
        &self,
        session_id: &SessionId,
        attempt_text: &str,
    ) -> Result<Dispatch<SubmitOutcome>, SessionError> {
        let (attempt, flight) = {
            let mut inner = self.lock();
            if inner.in_flight.is_some() {
                tracing::debug!(%session_id, "Ignoring submit while a request is in flight");
                return Ok(Dispatch::Ignored);
            }
            let attempt = ChallengeAttempt::new(attempt_text)?;
            let Some(mut challenge) = inner.take_challenge() else {
                return Err(ValidationError::NoActiveChallenge.into());
            };
            if challenge.session.id() != session_id {
                inner.state = SessionState::AwaitingChallenge(challenge);
                return Err(ValidationError::StaleSession(session_id.clone()).into());
            }

            challenge.draft.clear();
            inner.state = SessionState::AwaitingResult {
                challenge,
                attempt: attempt.clone(),
            };
            let flight = Flight::takeoff(&self.inner, &mut inner);
            (attempt, flight)
        };

        let result = self.service.solve(session_id, &attempt).await;

        let Some(mut inner) = flight.land() else {
            tracing::debug!(%session_id, "Discarding solve result after reset");
            return Ok(Dispatch::Superseded);
        };

        let mut challenge = match std::mem::replace(&mut inner.state, SessionState::Idle) {
            SessionState::AwaitingResult { challenge, .. } => challenge,
            other => {
                // Only reset moves us out of AwaitingResult, and reset bumps the epoch.
                tracing::error!(phase = other.phase().as_str(), "Solve completed in unexpected state");
                inner.state = other;
                return Ok(Dispatch::Superseded);
            }
        };

        match result {
            Ok(SolveResult::Retry { message }) => {
                challenge.rejections = challenge.rejections.saturating_add(1);
                challenge.notice = Some(message.clone());
                let rejections = challenge.rejections;
                tracing::info!(%session_id, rejections, "Challenge answer rejected");
                inner.state = SessionState::AwaitingChallenge(challenge);
                Ok(Dispatch::Completed(SubmitOutcome::Retry {
                    message,
                    rejections,
                }))
            }
            Ok(SolveResult::Resolved(outcome)) => {
                tracing::info!(
                    %session_id,
                    imei = %challenge.identifier.masked(),
                    verdict = outcome.verdict.as_str(),
                    "Verification resolved"
                );
                inner.state = SessionState::Resolved(Resolution {
                    identifier: challenge.identifier,
                    session: challenge.session,
                    outcome: outcome.clone(),
                    rejections: challenge.rejections,
                });
                Ok(Dispatch::Completed(SubmitOutcome::Resolved(outcome)))
            }
            Err(err) => {
                tracing::warn!(%session_id, error = %err, "Failed to submit challenge answer");
                inner.state = SessionState::AwaitingChallenge(challenge);
                Err(err.into())
            }
        }
    }
}
