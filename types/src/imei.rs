use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// A device identifier: exactly 15 ASCII digits.
///
/// The only way to obtain one is [`Imei::parse`], so holding an `Imei` means the
/// format check already ran and no request can go out with a malformed value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Imei(String);

impl Imei {
    pub const LEN: usize = 15;

    /// Digits left visible by [`Imei::masked`].
    const VISIBLE_SUFFIX: usize = 4;

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.len() == Self::LEN && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::MalformedIdentifier)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier with everything but the last four digits replaced by `*`.
    ///
    /// Use this form in logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let hidden = Self::LEN - Self::VISIBLE_SUFFIX;
        let mut out = "*".repeat(hidden);
        out.push_str(&self.0[hidden..]);
        out
    }
}

// Manual Debug impl to keep full identifiers out of debug output.
impl fmt::Debug for Imei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Imei").field(&self.masked()).finish()
    }
}

impl fmt::Display for Imei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Imei {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for Imei {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for Imei {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Imei> for String {
    fn from(value: Imei) -> Self {
        value.0
    }
}
