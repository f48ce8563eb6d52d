//! Solve results and the branch they select.

/// Terminal determination for a device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Verdict {
    Clean,
    Stolen,
    Unknown,
    /// A status the service contract does not define. Kept verbatim for logs.
    Unrecognized(String),
}

impl Verdict {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Clean => "clean",
            Self::Stolen => "stolen",
            Self::Unknown => "unknown",
            Self::Unrecognized(raw) => raw,
        }
    }

    #[must_use]
    pub const fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

/// The resolved result of a verification session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    pub message: String,
}

impl Outcome {
    #[must_use]
    pub fn new(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn branch(&self) -> Branch {
        select_branch(&self.verdict)
    }
}

/// What a single solve call produced.
///
/// `Retry` is an expected result, not an error: the challenge text did not
/// match and the same challenge should be attempted again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveResult {
    Retry { message: String },
    Resolved(Outcome),
}

impl SolveResult {
    /// Interpret a wire `status` value.
    ///
    /// Matching is exact. Anything outside the four contract values, including
    /// a case or whitespace variant of one, becomes [`Verdict::Unrecognized`].
    #[must_use]
    pub fn from_wire(status: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let verdict = match status {
            "retry" => return Self::Retry { message },
            "clean" => Verdict::Clean,
            "stolen" => Verdict::Stolen,
            "unknown" => Verdict::Unknown,
            _ => Verdict::Unrecognized(status.to_string()),
        };
        Self::Resolved(Outcome::new(verdict, message))
    }
}

/// Follow-up path presented once a session resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    /// The device is clean: sell it or insure it.
    SellOrInsure,
    /// The device is reported or could not be cleared: look for a safe replacement.
    SafeReplacement,
}

impl Branch {
    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::SellOrInsure => "No theft report found",
            Self::SafeReplacement => "Do not buy this phone",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SellOrInsure => {
                "This phone checks out. Get a resale quote or look into theft insurance."
            }
            Self::SafeReplacement => {
                "Buying this phone is risky. Look for a verified device sold with a warranty."
            }
        }
    }
}

/// Branch for a verdict. Unrecognized verdicts are treated as `Unknown`.
#[must_use]
pub fn select_branch(verdict: &Verdict) -> Branch {
    match verdict {
        Verdict::Clean => Branch::SellOrInsure,
        Verdict::Stolen | Verdict::Unknown | Verdict::Unrecognized(_) => Branch::SafeReplacement,
    }
}

#[cfg(test)]
mod tests {
    use super::{Branch, Outcome, SolveResult, Verdict, select_branch};

    #[test]
    fn retry_is_not_a_verdict() {
        assert_eq!(
            SolveResult::from_wire("retry", "wrong text"),
            SolveResult::Retry {
                message: "wrong text".to_string()
            }
        );
    }

    #[test]
    fn known_statuses() {
        let cases = [
            ("clean", Verdict::Clean),
            ("stolen", Verdict::Stolen),
            ("unknown", Verdict::Unknown),
        ];
        for (wire, expected) in cases {
            match SolveResult::from_wire(wire, "m") {
                SolveResult::Resolved(outcome) => assert_eq!(outcome.verdict, expected),
                SolveResult::Retry { .. } => panic!("{wire:?} parsed as retry"),
            }
        }
    }

    #[test]
    fn status_variants_are_not_contract_values() {
        for wire in ["CLEAN", " clean", "clean ", "Stolen", "UNKNOWN"] {
            let SolveResult::Resolved(outcome) = SolveResult::from_wire(wire, "m") else {
                panic!("{wire:?} parsed as retry");
            };
            assert_eq!(outcome.verdict, Verdict::Unrecognized(wire.to_string()));
            assert_eq!(outcome.branch(), Branch::SafeReplacement, "{wire:?}");
        }
    }

    #[test]
    fn retry_variants_resolve_defensively() {
        for wire in ["Retry", "RETRY", " retry"] {
            let SolveResult::Resolved(outcome) = SolveResult::from_wire(wire, "m") else {
                panic!("{wire:?} parsed as retry");
            };
            assert_eq!(outcome.branch(), Branch::SafeReplacement);
        }
    }

    #[test]
    fn unrecognized_status_kept_verbatim() {
        let SolveResult::Resolved(outcome) = SolveResult::from_wire("blacklisted", "?") else {
            panic!("expected a resolved outcome");
        };
        assert_eq!(
            outcome.verdict,
            Verdict::Unrecognized("blacklisted".to_string())
        );
        assert!(!outcome.verdict.is_recognized());
        assert_eq!(outcome.verdict.as_str(), "blacklisted");
    }

    #[test]
    fn branch_selection() {
        assert_eq!(select_branch(&Verdict::Clean), Branch::SellOrInsure);
        assert_eq!(select_branch(&Verdict::Stolen), Branch::SafeReplacement);
        assert_eq!(select_branch(&Verdict::Unknown), Branch::SafeReplacement);
        assert_eq!(
            select_branch(&Verdict::Unrecognized(String::new())),
            Branch::SafeReplacement
        );
    }

    #[test]
    fn outcome_branch_delegates() {
        let outcome = Outcome::new(Verdict::Clean, "No theft record found");
        assert_eq!(outcome.branch(), Branch::SellOrInsure);
    }

    #[test]
    fn branch_copy_is_distinct() {
        assert_ne!(
            Branch::SellOrInsure.headline(),
            Branch::SafeReplacement.headline()
        );
    }
}
