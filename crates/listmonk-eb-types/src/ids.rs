//! Logical identifiers for declared resources
//!
//! A logical id is derived from the construct path of the resource, so the
//! same declaration always lands on the same id across synthesis runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of hex digits of the path digest appended to the readable part.
const DIGEST_LEN: usize = 8;

/// Maximum length of a logical id accepted by the provisioning engine.
const MAX_LEN: usize = 255;

/// Stable identifier of a resource inside a plan
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derive an id from a construct path.
    ///
    /// The readable part keeps only the ASCII alphanumeric characters of each
    /// component; the suffix is the uppercase BLAKE3 digest of the full path
    /// joined with `/`, which keeps ids unique even when two paths collapse to
    /// the same readable text.
    pub fn from_path(path: &[&str]) -> Self {
        let readable: String = path
            .iter()
            .flat_map(|component| component.chars())
            .filter(char::is_ascii_alphanumeric)
            .take(MAX_LEN - DIGEST_LEN)
            .collect();

        let digest = blake3::hash(path.join("/").as_bytes());
        let suffix: String = digest.to_hex()[..DIGEST_LEN].to_ascii_uppercase();

        Self(format!("{readable}{suffix}"))
    }

    /// Wrap an id that was produced elsewhere (for example a saved plan).
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
