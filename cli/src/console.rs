//! Line-oriented prompt loop driving a [`VerificationSession`].

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use imei_client::LookupService;
use imei_core::{Dispatch, Outcome, Session, SubmitOutcome, VerificationSession};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::challenge::{self, ChallengeLocation};

pub struct Console<R, W> {
    input: R,
    output: W,
    challenge_dir: PathBuf,
}

impl<R, W> Console<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(input: R, output: W, challenge_dir: PathBuf) -> Self {
        Self {
            input,
            output,
            challenge_dir,
        }
    }

    /// Run checks until the user declines another one or input ends.
    ///
    /// `identifier` answers the first IMEI prompt.
    pub async fn run<S: LookupService>(
        &mut self,
        flow: &VerificationSession<S>,
        mut identifier: Option<String>,
    ) -> Result<()> {
        writeln!(self.output, "IMEI Hunter: check a phone against theft records.")?;

        loop {
            let raw = match identifier.take() {
                Some(raw) => raw,
                None => match self.prompt("IMEI (15 digits, empty to quit): ").await? {
                    Some(line) if !line.is_empty() => line,
                    _ => return Ok(()),
                },
            };

            let session = match flow.begin(&raw).await {
                Ok(Dispatch::Completed(session)) => session,
                Ok(Dispatch::Ignored | Dispatch::Superseded) => continue,
                Err(err) => {
                    writeln!(self.output, "Error: {err}")?;
                    continue;
                }
            };

            self.show_challenge(&session)?;
            let Some(outcome) = self.solve(flow, &session).await? else {
                flow.reset();
                return Ok(());
            };
            self.show_outcome(&outcome)?;

            let again = self.prompt("Check another device? [y/N]: ").await?;
            flow.reset();
            if !again.is_some_and(|a| a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes"))
            {
                return Ok(());
            }
        }
    }

    /// Prompt for challenge text until the service returns a verdict.
    /// `None` when input ends first.
    async fn solve<S: LookupService>(
        &mut self,
        flow: &VerificationSession<S>,
        session: &Session,
    ) -> Result<Option<Outcome>> {
        loop {
            let Some(text) = self.prompt("Challenge text: ").await? else {
                return Ok(None);
            };
            flow.edit_attempt(&text);

            match flow.submit_challenge(session.id(), &text).await {
                Ok(Dispatch::Completed(SubmitOutcome::Resolved(outcome))) => {
                    return Ok(Some(outcome));
                }
                Ok(Dispatch::Completed(SubmitOutcome::Retry { message, .. })) => {
                    let message = if message.is_empty() {
                        "Incorrect, try again."
                    } else {
                        message.as_str()
                    };
                    writeln!(self.output, "{message}")?;
                    self.show_challenge(session)?;
                }
                Ok(Dispatch::Ignored | Dispatch::Superseded) => {}
                Err(err) => writeln!(self.output, "Error: {err}")?,
            }
        }
    }

    fn show_challenge(&mut self, session: &Session) -> Result<()> {
        match challenge::materialize(&self.challenge_dir, session) {
            Ok(ChallengeLocation::Saved(path)) => {
                writeln!(self.output, "Challenge image: {}", path.display())?;
            }
            Ok(ChallengeLocation::Reference(reference)) => {
                writeln!(self.output, "Challenge: {reference}")?;
            }
            Err(err) => {
                tracing::warn!(error = %err, session_id = %session.id(), "Could not save challenge image");
                writeln!(self.output, "Could not save challenge image: {err:#}")?;
            }
        }
        Ok(())
    }

    fn show_outcome(&mut self, outcome: &Outcome) -> Result<()> {
        let branch = outcome.branch();
        let verdict = if outcome.verdict.is_recognized() {
            outcome.verdict.as_str()
        } else {
            "unknown"
        };
        writeln!(self.output, "Result: {verdict}")?;
        if !outcome.message.is_empty() {
            writeln!(self.output, "{}", outcome.message)?;
        }
        writeln!(self.output)?;
        writeln!(self.output, "{}", branch.headline())?;
        writeln!(self.output, "{}", branch.description())?;
        Ok(())
    }

    /// Trimmed line, or `None` at end of input.
    async fn prompt(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{label}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).await? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}
