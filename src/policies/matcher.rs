//! # Type matchers for the validation allow-list.
//!
//! [`TypeMatcher`] follows the syntax of an HTML `accept` attribute entry:
//!
//! | Input              | Matcher                          | Matches                              |
//! |--------------------|----------------------------------|--------------------------------------|
//! | `application/pdf`  | [`TypeMatcher::MediaType`]       | exactly that media type              |
//! | `image/*`          | [`TypeMatcher::MediaRange`]      | any `image/...` media type           |
//! | `*/*`              | [`TypeMatcher::Any`]             | everything                           |
//! | `.pdf`, `.tar.gz`  | [`TypeMatcher::Extension`]       | file names ending in that extension  |
//!
//! Matching is case-insensitive and ignores media type parameters
//! (`text/plain; charset=utf-8` matches `text/plain`). Extension matchers look at the
//! file name only, so they still work when the declared media type is empty.
//!
//! # Example
//! ```rust
//! use intakevisor::{FileHandle, TypeMatcher};
//!
//! let m: TypeMatcher = "image/*".parse().unwrap();
//! assert!(m.matches(&FileHandle::from_bytes("cat.png", "image/png", vec![1u8])));
//! assert!(!m.matches(&FileHandle::from_bytes("a.pdf", "application/pdf", vec![1u8])));
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::tasks::FileHandle;

/// Error parsing a type matcher string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid type matcher '{input}': expected 'type/subtype', 'type/*' or '.ext'")]
pub struct MatcherParseError {
    input: String,
}

impl MatcherParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// One entry of the allowed-types list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMatcher {
    /// Exact media type, stored lowercased (`application/pdf`).
    MediaType(String),
    /// Top-level media range, stored lowercased without `/*` (`image`).
    MediaRange(String),
    /// File name extension, stored lowercased without the leading dot (`pdf`).
    Extension(String),
    /// Matches every file (`*/*`).
    Any,
}

impl TypeMatcher {
    /// Exact media type matcher; parameters (`; charset=...`) are dropped.
    pub fn media_type(media_type: &str) -> Self {
        TypeMatcher::MediaType(essence(media_type))
    }

    /// Media range matcher for a top-level type (`"image"` → `image/*`).
    pub fn media_range(top: &str) -> Self {
        TypeMatcher::MediaRange(top.trim().to_ascii_lowercase())
    }

    /// Extension matcher; a leading dot is optional.
    pub fn extension(ext: &str) -> Self {
        let ext = ext.trim();
        TypeMatcher::Extension(ext.strip_prefix('.').unwrap_or(ext).to_ascii_lowercase())
    }

    /// Returns true if `file` is matched by this entry.
    pub fn matches(&self, file: &FileHandle) -> bool {
        match self {
            TypeMatcher::Any => true,
            TypeMatcher::MediaType(expected) => essence(file.media_type()) == *expected,
            TypeMatcher::MediaRange(top) => essence(file.media_type())
                .split_once('/')
                .is_some_and(|(t, sub)| t == top && !sub.is_empty()),
            TypeMatcher::Extension(ext) => {
                let name = file.name().to_ascii_lowercase();
                name.len() > ext.len() + 1
                    && name.ends_with(ext.as_str())
                    && name.as_bytes()[name.len() - ext.len() - 1] == b'.'
            }
        }
    }
}

impl FromStr for TypeMatcher {
    type Err = MatcherParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.split(';').next().unwrap_or_default().trim();
        if trimmed.is_empty() {
            return Err(MatcherParseError::new(s));
        }

        if let Some(ext) = trimmed.strip_prefix('.') {
            if ext.is_empty() || ext.contains(['/', '*']) || ext.ends_with('.') {
                return Err(MatcherParseError::new(s));
            }
            return Ok(TypeMatcher::extension(ext));
        }

        let Some((top, sub)) = trimmed.split_once('/') else {
            return Err(MatcherParseError::new(s));
        };
        if top.is_empty() || sub.is_empty() || sub.contains('/') {
            return Err(MatcherParseError::new(s));
        }
        match (top, sub) {
            ("*", "*") => Ok(TypeMatcher::Any),
            ("*", _) => Err(MatcherParseError::new(s)),
            (_, "*") => Ok(TypeMatcher::media_range(top)),
            _ => Ok(TypeMatcher::media_type(trimmed)),
        }
    }
}

impl fmt::Display for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMatcher::MediaType(t) => f.write_str(t),
            TypeMatcher::MediaRange(top) => write!(f, "{top}/*"),
            TypeMatcher::Extension(ext) => write!(f, ".{ext}"),
            TypeMatcher::Any => f.write_str("*/*"),
        }
    }
}

/// Lowercased media type without parameters.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
