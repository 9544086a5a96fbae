use crate::error::ResolutionError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static UUID_V4: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        "^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-4[a-fA-F0-9]{3}-[89abAB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}$",
    )
    .expect("uuid v4 pattern is valid")
});

/// Identifier of the job a container runs for. Always holds a canonical
/// hyphenated UUIDv4 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn parse(value: &str) -> Result<Self, ResolutionError> {
        if UUID_V4.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(ResolutionError::InvalidIdentity(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for JobId {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
