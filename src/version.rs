// src/version.rs

//! Package version parsing and normalization
//!
//! Feed versions use up to four numeric parts plus an optional prerelease
//! tag: `major[.minor[.patch[.revision]]][-prerelease][+build]`. The
//! normalized form is lowercase, pads to three numeric parts, keeps a
//! non-zero fourth part, keeps the prerelease tag, and drops build
//! metadata. The normalized form is the storage and row key.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A parsed package version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    /// Lowercase prerelease tag without the leading dash, if any
    pub prerelease: Option<String>,
}

impl PackageVersion {
    /// Parse a version string
    ///
    /// Examples:
    /// - "1.2" → 1.2.0
    /// - "1.2.3.0" → 1.2.3
    /// - "1.0.0-Beta.1+sha" → 1.0.0-beta.1 (build metadata dropped)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidVersion {
                value: s.to_string(),
            });
        }

        // Build metadata never participates in identity or ordering.
        let without_build = match s.find('+') {
            Some(pos) => &s[..pos],
            None => s,
        };

        let (numeric, prerelease) = match without_build.find('-') {
            Some(pos) => (
                &without_build[..pos],
                Some(without_build[pos + 1..].to_ascii_lowercase()),
            ),
            None => (without_build, None),
        };

        if let Some(pre) = &prerelease {
            if pre.is_empty() {
                return Err(Error::InvalidVersion {
                    value: s.to_string(),
                });
            }
        }

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(Error::InvalidVersion {
                value: s.to_string(),
            });
        }

        let mut nums = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part.parse::<u64>().map_err(|_| Error::InvalidVersion {
                value: s.to_string(),
            })?;
        }

        Ok(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            revision: nums[3],
            prerelease,
        })
    }

    /// The canonical lowercase string form used as the storage and row key
    pub fn normalized(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision != 0 {
            out.push_str(&format!(".{}", self.revision));
        }
        if let Some(pre) = &self.prerelease {
            out.push('-');
            out.push_str(pre);
        }
        out
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn numeric_parts(&self) -> [u64; 4] {
        [self.major, self.minor, self.patch, self.revision]
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.numeric_parts().cmp(&other.numeric_parts()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // A release sorts above any prerelease of the same numeric version.
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => compare_prerelease(a, b),
        }
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare dot-separated prerelease tags: numeric segments compare
/// numerically and sort below alphanumeric ones, matching the usual
/// prerelease precedence rules.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.normalized())
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PackageVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}
