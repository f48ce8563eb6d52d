//! Server-issued session data and the user's answer to its challenge.

use std::fmt;

use crate::ValidationError;

/// Opaque correlation id issued by the lookup service's start endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Returns `None` for an empty id; the service never issues one.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The challenge image exactly as the service returned it.
///
/// Usually a `data:` URI; anything else is kept as an opaque reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeImage(String);

/// Borrowed view of a base64 `data:` URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub media_type: &'a str,
    pub base64_payload: &'a str,
}

impl DataUri<'_> {
    /// File extension for the media type, defaulting to `bin`.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.media_type.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }
}

impl ChallengeImage {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a `data:<media-type>;base64,<payload>` URI.
    ///
    /// Returns `None` for non-data references and for data URIs that are not
    /// base64 encoded.
    #[must_use]
    pub fn data_uri(&self) -> Option<DataUri<'_>> {
        let rest = self.0.trim().strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        let mut params = header.split(';');
        let media_type = params.next().unwrap_or_default();
        if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
            return None;
        }
        Some(DataUri {
            media_type: if media_type.is_empty() {
                "text/plain"
            } else {
                media_type
            },
            base64_payload: payload,
        })
    }
}

/// A started verification session.
///
/// Both fields come from one successful start response and never change
/// afterwards; a retry reuses the same id and image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    challenge_image: ChallengeImage,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId, challenge_image: ChallengeImage) -> Self {
        Self {
            id,
            challenge_image,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn challenge_image(&self) -> &ChallengeImage {
        &self.challenge_image
    }
}

/// Text the user read off the challenge image.
///
/// Guaranteed non-empty after trimming; the trimmed text is what gets sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeAttempt(String);

impl ChallengeAttempt {
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let text = raw.trim();
        if text.is_empty() {
            Err(ValidationError::EmptyChallengeText)
        } else {
            Ok(Self(text.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
