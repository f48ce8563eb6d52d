//! Putting challenge images somewhere the user can open them.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use imei_core::Session;

const MAX_NAME_CHARS: usize = 64;

/// Where a challenge can be viewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeLocation {
    /// Decoded from a data URI and written to disk.
    Saved(PathBuf),
    /// Not a data URI; shown as given.
    Reference(String),
}

/// Write the session's challenge image into `dir`.
///
/// Data URIs are decoded to `challenge-<session id>.<ext>`; a retried
/// challenge overwrites its own file. Anything else is returned untouched.
pub fn materialize(dir: &Path, session: &Session) -> Result<ChallengeLocation> {
    let image = session.challenge_image();
    let Some(data) = image.data_uri() else {
        return Ok(ChallengeLocation::Reference(image.as_str().to_string()));
    };

    let payload: String = data
        .base64_payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = STANDARD
        .decode(payload.as_bytes())
        .context("challenge image is not valid base64")?;

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!(
        "challenge-{}.{}",
        file_stem(session.id().as_str()),
        data.extension()
    ));
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;

    tracing::debug!(path = %path.display(), session_id = %session.id(), "Challenge image written");
    Ok(ChallengeLocation::Saved(path))
}

fn file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .take(MAX_NAME_CHARS)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
