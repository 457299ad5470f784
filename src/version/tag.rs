// SPDX-License-Identifier: GPL-3.0-only
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[vV]?(\d+(?:\.\d+)*)$").expect("version pattern is a valid regex")
});

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {0:?}")]
    InvalidVersionFormat(String),
}

/// A parsed release version made of dotted numeric components.
///
/// Trailing zero components carry no meaning, so `1.0` and `1.0.0` are the
/// same release. Equality, hashing and ordering all use the normalized
/// components; the original text is only kept for display.
#[derive(Debug, Clone)]
pub struct VersionTag {
    raw: String,
    components: Vec<u64>,
}

impl VersionTag {
    pub fn parse(text: &str) -> Result<Self, VersionError> {
        let trimmed = text.trim();
        let captures = VERSION_PATTERN
            .captures(trimmed)
            .ok_or_else(|| VersionError::InvalidVersionFormat(text.to_string()))?;

        let mut components = captures[1]
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError::InvalidVersionFormat(text.to_string()))?;

        while components.len() > 1 && components.last() == Some(&0) {
            components.pop();
        }

        Ok(Self {
            raw: trimmed.to_string(),
            components,
        })
    }

    #[cfg(test)]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[cfg(test)]
    pub fn components(&self) -> &[u64] {
        &self.components
    }
}

/// Compare two version tags.
pub fn compare(a: &VersionTag, b: &VersionTag) -> Ordering {
    a.cmp(b)
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        // Components are normalized, so a missing component reads as zero.
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let left = self.components.get(i).copied().unwrap_or(0);
            let right = other.components.get(i).copied().unwrap_or(0);
            match left.cmp(&right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.components == other.components
    }
}

impl Eq for VersionTag {}

impl Hash for VersionTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
    }
}

impl FromStr for VersionTag {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
