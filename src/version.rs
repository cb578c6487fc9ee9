//! Version parsing and ordering.
//!
//! Versions follow the usual Python-style layout:
//! `[epoch!]release[qualifiers][+local]`, e.g. `1!2.0.0rc1.post2+ubuntu1`.
//! Ordering is total: every pair of parsed versions is either less, equal
//! or greater, and trailing zero release segments do not matter.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a version string could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("empty version string")]
    Empty,

    #[error("no leading numeric segment in '{0}'")]
    NoLeadingNumber(String),

    #[error("numeric segment out of range in '{0}'")]
    Overflow(String),

    #[error("invalid release segment in '{0}'")]
    InvalidRelease(String),

    #[error("invalid qualifier in '{0}'")]
    InvalidQualifier(String),

    #[error("invalid local tag in '{0}'")]
    InvalidLocal(String),
}

/// Release phase of a qualifier.
///
/// `Final` is never stored; it stands in for a missing qualifier when two
/// qualifier lists of different length are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Dev,
    Pre,
    Final,
    Post,
}

/// A single pre/post/dev qualifier such as `rc1` or `post2`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier {
    pub phase: Phase,
    pub tag: String,
    pub number: u64,
}

impl Qualifier {
    fn new(tag: &str, number: u64) -> Self {
        let tag = match tag {
            "alpha" => "a",
            "beta" => "b",
            "c" | "pre" | "preview" => "rc",
            "rev" | "r" => "post",
            other => other,
        };
        let phase = match tag {
            "dev" => Phase::Dev,
            "post" => Phase::Post,
            _ => Phase::Pre,
        };
        Self {
            phase,
            tag: tag.to_string(),
            number,
        }
    }

    fn final_marker() -> Self {
        Self {
            phase: Phase::Final,
            tag: String::new(),
            number: 0,
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, self.number)
    }
}

/// A parsed, immutable version.
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u64,
    pub release: Vec<u64>,
    pub qualifiers: Vec<Qualifier>,
    pub local: Option<String>,
}

impl Version {
    /// Parse a version string.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let input = raw.trim().to_ascii_lowercase();
        if input.is_empty() {
            return Err(VersionError::Empty);
        }

        let (public, local) = match input.split_once('+') {
            Some((public, local)) => (public, Some(parse_local(local, raw)?)),
            None => (input.as_str(), None),
        };

        let (epoch, rest) = match public.split_once('!') {
            Some((epoch, rest)) => (parse_number(epoch, raw)?, rest),
            None => (0, public),
        };

        let (release, rest) = parse_release(rest, raw)?;
        let qualifiers = parse_qualifiers(rest, raw)?;

        Ok(Self {
            epoch,
            release,
            qualifiers,
            local,
        })
    }

    /// True if any qualifier marks this as a pre-release or development release.
    pub fn is_prerelease(&self) -> bool {
        self.qualifiers
            .iter()
            .any(|q| matches!(q.phase, Phase::Dev | Phase::Pre))
    }
}

fn parse_number(digits: &str, raw: &str) -> Result<u64, VersionError> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(VersionError::NoLeadingNumber(raw.to_string()));
    }
    digits
        .parse()
        .map_err(|_| VersionError::Overflow(raw.to_string()))
}

/// Consume `N(.N)*` from the front of `input`, returning the segments and the remainder.
fn parse_release<'a>(input: &'a str, raw: &str) -> Result<(Vec<u64>, &'a str), VersionError> {
    let mut release = Vec::new();
    let mut rest = input;

    loop {
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            if release.is_empty() {
                return Err(VersionError::NoLeadingNumber(raw.to_string()));
            }
            // "1.rc1" style: the dot introduced a qualifier, not a segment
            break;
        }
        release.push(parse_number(&rest[..end], raw)?);
        rest = &rest[end..];

        match rest.strip_prefix('.') {
            Some(after) if after.starts_with(|c: char| c.is_ascii_digit()) => rest = after,
            Some(after) if after.is_empty() => {
                return Err(VersionError::InvalidRelease(raw.to_string()))
            }
            _ => break,
        }
    }

    Ok((release, rest))
}

fn parse_qualifiers(input: &str, raw: &str) -> Result<Vec<Qualifier>, VersionError> {
    let mut qualifiers = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let mut separated = false;
        while i < bytes.len() && matches!(bytes[i], b'.' | b'-' | b'_') {
            separated = bytes[i] == b'-' || separated;
            i += 1;
        }
        if i == bytes.len() {
            return Err(VersionError::InvalidQualifier(raw.to_string()));
        }

        let tag_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        let tag = &input[tag_start..i];

        // "beta.2" and "rc-1" spell the same qualifier as "beta2" and "rc1"
        if !tag.is_empty()
            && i + 1 < bytes.len()
            && matches!(bytes[i], b'.' | b'-' | b'_')
            && bytes[i + 1].is_ascii_digit()
        {
            i += 1;
        }
        let num_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let digits = &input[num_start..i];

        if tag.is_empty() {
            // A bare "-N" is an implicit post release, allowed only after the
            // release or a pre-release: "1.0-3", "1.0rc1-1"
            let after_pre = qualifiers.iter().all(|q: &Qualifier| q.phase == Phase::Pre);
            if digits.is_empty() || !separated || !after_pre {
                return Err(VersionError::InvalidQualifier(raw.to_string()));
            }
            qualifiers.push(Qualifier::new("post", parse_number(digits, raw)?));
            continue;
        }

        let number = if digits.is_empty() {
            0
        } else {
            parse_number(digits, raw)?
        };
        qualifiers.push(Qualifier::new(tag, number));
    }

    Ok(qualifiers)
}

fn parse_local(local: &str, raw: &str) -> Result<String, VersionError> {
    let segments: Vec<&str> = local.split(['.', '-', '_']).collect();
    let valid = segments
        .iter()
        .all(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric()));
    if !valid {
        return Err(VersionError::InvalidLocal(raw.to_string()));
    }
    Ok(segments.join("."))
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_release(&self.release, &other.release))
            .then_with(|| compare_qualifiers(&self.qualifiers, &other.qualifiers))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

fn compare_release(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

fn compare_qualifiers(a: &[Qualifier], b: &[Qualifier]) -> Ordering {
    let marker = Qualifier::final_marker();
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).unwrap_or(&marker);
            let y = b.get(i).unwrap_or(&marker);
            x.cmp(y)
        })
        .find(|ord| *ord != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(u64::to_string).collect();
        write!(f, "{}", release.join("."))?;
        for qualifier in &self.qualifiers {
            match qualifier.phase {
                Phase::Pre => write!(f, "{}", qualifier)?,
                _ => write!(f, ".{}", qualifier)?,
            }
        }
        if let Some(ref local) = self.local {
            write!(f, "+{}", local)?;
        }
        Ok(())
    }
}

/// A version as seen by the classifier: absent, parsed, or unparseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionState {
    /// No version string was available.
    Unknown,
    Parsed(Version),
    Invalid { raw: String, reason: VersionError },
}

impl VersionState {
    /// Parse an optional raw string. Never fails; malformed input becomes `Invalid`.
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Unknown,
            Some(s) => match Version::parse(s) {
                Ok(v) => Self::Parsed(v),
                Err(reason) => Self::Invalid {
                    raw: s.to_string(),
                    reason,
                },
            },
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match self {
            Self::Parsed(v) => Some(v),
            _ => None,
        }
    }
}
