//! Step states of a verification session.

use imei_types::{Branch, ChallengeAttempt, Imei, Outcome, Session};

/// Where a verification session currently stands.
///
/// Each variant carries exactly the data that exists at that step, so an
/// outcome without a session, or a session without an identifier, cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingChallenge(PendingChallenge),
    /// An answer is in flight.
    AwaitingResult {
        challenge: PendingChallenge,
        attempt: ChallengeAttempt,
    },
    Resolved(Resolution),
}

impl SessionState {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::AwaitingChallenge(_) => Phase::AwaitingChallenge,
            Self::AwaitingResult { .. } => Phase::AwaitingResult,
            Self::Resolved(_) => Phase::Resolved,
        }
    }

    #[must_use]
    pub fn identifier(&self) -> Option<&Imei> {
        match self {
            Self::Idle => None,
            Self::AwaitingChallenge(challenge) | Self::AwaitingResult { challenge, .. } => {
                Some(&challenge.identifier)
            }
            Self::Resolved(resolution) => Some(&resolution.identifier),
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Idle => None,
            Self::AwaitingChallenge(challenge) | Self::AwaitingResult { challenge, .. } => {
                Some(&challenge.session)
            }
            Self::Resolved(resolution) => Some(&resolution.session),
        }
    }

    #[must_use]
    pub fn challenge(&self) -> Option<&PendingChallenge> {
        match self {
            Self::AwaitingChallenge(challenge) | Self::AwaitingResult { challenge, .. } => {
                Some(challenge)
            }
            Self::Idle | Self::Resolved(_) => None,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        match self {
            Self::Resolved(resolution) => Some(&resolution.outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn branch(&self) -> Option<Branch> {
        self.outcome().map(Outcome::branch)
    }
}

/// Data-free view of [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    AwaitingChallenge,
    AwaitingResult,
    Resolved,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingChallenge => "awaiting challenge",
            Self::AwaitingResult => "awaiting result",
            Self::Resolved => "resolved",
        }
    }
}

/// A started session whose challenge has not been answered correctly yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub(crate) identifier: Imei,
    pub(crate) session: Session,
    pub(crate) draft: String,
    pub(crate) rejections: u32,
    pub(crate) notice: Option<String>,
}

impl PendingChallenge {
    pub(crate) fn new(identifier: Imei, session: Session) -> Self {
        Self {
            identifier,
            session,
            draft: String::new(),
            rejections: 0,
            notice: None,
        }
    }

    #[must_use]
    pub fn identifier(&self) -> &Imei {
        &self.identifier
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Text staged by the user but not yet submitted. Empty after every submission.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// How many answers the service has rejected for this challenge.
    #[must_use]
    pub const fn rejections(&self) -> u32 {
        self.rejections
    }

    /// The service's message from the last rejected answer.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }
}

/// A session that reached a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub(crate) identifier: Imei,
    pub(crate) session: Session,
    pub(crate) outcome: Outcome,
    pub(crate) rejections: u32,
}

impl Resolution {
    #[must_use]
    pub fn identifier(&self) -> &Imei {
        &self.identifier
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    #[must_use]
    pub fn branch(&self) -> Branch {
        self.outcome.branch()
    }

    #[must_use]
    pub const fn rejections(&self) -> u32 {
        self.rejections
    }
}

/// Result of a transition that talks to the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch<T> {
    Completed(T),
    /// Another request was already in flight; nothing was sent.
    Ignored,
    /// The session was reset while the request was in flight; its result was dropped.
    Superseded,
}

impl<T> Dispatch<T> {
    #[must_use]
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Ignored | Self::Superseded => None,
        }
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// What a completed challenge submission led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Wrong text. Re-prompt with the same challenge.
    Retry { message: String, rejections: u32 },
    Resolved(Outcome),
}

#[cfg(test)]
mod tests {
    use super::{Dispatch, PendingChallenge, Phase, Resolution, SessionState};
    use imei_types::{Branch, ChallengeImage, Imei, Outcome, Session, SessionId, Verdict};

    fn session() -> Session {
        Session::new(
            SessionId::new("abc123").unwrap(),
            ChallengeImage::new("data:image/png;base64,AAAA"),
        )
    }

    fn imei() -> Imei {
        Imei::parse("352012345678910").unwrap()
    }

    #[test]
    fn idle_has_nothing() {
        let state = SessionState::Idle;
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.identifier().is_none());
        assert!(state.session().is_none());
        assert!(state.outcome().is_none());
        assert!(state.branch().is_none());
    }

    #[test]
    fn awaiting_challenge_exposes_session() {
        let state = SessionState::AwaitingChallenge(PendingChallenge::new(imei(), session()));
        assert_eq!(state.phase(), Phase::AwaitingChallenge);
        assert_eq!(state.session().unwrap().id().as_str(), "abc123");
        assert_eq!(state.challenge().unwrap().draft(), "");
        assert!(state.outcome().is_none());
    }

    #[test]
    fn resolved_selects_branch() {
        let state = SessionState::Resolved(Resolution {
            identifier: imei(),
            session: session(),
            outcome: Outcome::new(Verdict::Stolen, "reported"),
            rejections: 1,
        });
        assert_eq!(state.phase(), Phase::Resolved);
        assert_eq!(state.branch(), Some(Branch::SafeReplacement));
        assert!(state.challenge().is_none());
    }

    #[test]
    fn dispatch_completed() {
        assert_eq!(Dispatch::Completed(3).completed(), Some(3));
        assert_eq!(Dispatch::<u8>::Ignored.completed(), None);
        assert!(!Dispatch::<u8>::Superseded.is_completed());
    }

    #[test]
    fn phase_labels() {
        assert_eq!(Phase::AwaitingResult.as_str(), "awaiting result");
    }
}
