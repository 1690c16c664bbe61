//! SQL Server product version
//!
//! `SERVERPROPERTY('ProductVersion')` returns strings such as `15.0.2000.5`.
//! They are split on `.` and `-`; numeric parts become numbers and anything
//! else is kept as text, so pre-release tags survive (`14.0-RC1`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One component of a version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionPart {
    Number(i64),
    Text(String),
}

impl fmt::Display for VersionPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionPart::Number(n) => write!(f, "{}", n),
            VersionPart::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for VersionPart {
    fn from(n: i64) -> Self {
        VersionPart::Number(n)
    }
}

impl From<&str> for VersionPart {
    fn from(s: &str) -> Self {
        VersionPart::Text(s.to_string())
    }
}

/// The version assumed when the server cannot be asked (SQL Server 2016)
pub const FALLBACK_SERVER_VERSION: [i64; 3] = [13, 0, 0];

/// An ordered version tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerVersion(Vec<VersionPart>);

impl ServerVersion {
    pub fn new(parts: Vec<VersionPart>) -> Self {
        Self(parts)
    }

    /// Parse a product version string; this never fails
    pub fn parse(raw: &str) -> Self {
        let parts = raw
            .split(['.', '-'])
            .map(|part| match part.trim().parse::<i64>() {
                Ok(n) => VersionPart::Number(n),
                Err(_) => VersionPart::Text(part.to_string()),
            })
            .collect();
        Self(parts)
    }

    /// `(13, 0, 0)`
    pub fn fallback() -> Self {
        Self::from(&FALLBACK_SERVER_VERSION[..])
    }

    pub fn parts(&self) -> &[VersionPart] {
        &self.0
    }

    /// The leading number, if the version starts with one
    pub fn major(&self) -> Option<i64> {
        match self.0.first() {
            Some(VersionPart::Number(n)) => Some(*n),
            _ => None,
        }
    }

    /// Compare the leading numeric parts against `minimum`
    ///
    /// Missing parts count as zero. A text part ends the comparison and is
    /// treated as older than any number in the same position.
    pub fn is_at_least(&self, minimum: &[i64]) -> bool {
        for (idx, want) in minimum.iter().enumerate() {
            let have = match self.0.get(idx) {
                Some(VersionPart::Number(n)) => *n,
                Some(VersionPart::Text(_)) => return false,
                None => 0,
            };
            match have.cmp(want) {
                Ordering::Greater => return true,
                Ordering::Less => return false,
                Ordering::Equal => continue,
            }
        }
        true
    }
}

impl From<&[i64]> for ServerVersion {
    fn from(parts: &[i64]) -> Self {
        Self(parts.iter().copied().map(VersionPart::Number).collect())
    }
}

impl FromStr for ServerVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, part) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}
