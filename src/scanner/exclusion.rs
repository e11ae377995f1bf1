//! Configured path exclusions: assets under a matching path are never scanned.
//!
//! Patterns use shell-style globs over asset paths: `*` matches within one
//! path segment, `**` matches across segments, `?` matches a single character.
//! Matching ignores ASCII case, like the namespace test. A pattern that matches
//! a folder excludes everything below it.

#![allow(missing_docs)]

use regex::Regex;

use crate::assets::model::AssetPath;
use crate::core::errors::{AhcError, Result};

#[derive(Debug, Clone)]
struct GlobPattern {
    original: String,
    compiled: Regex,
}

/// Compiled set of exclusion globs.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<GlobPattern>,
}

impl ExclusionSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                Ok(GlobPattern {
                    original: pattern.clone(),
                    compiled: glob_to_regex(pattern)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[must_use]
    pub fn is_excluded(&self, path: &AssetPath) -> bool {
        self.matching_pattern(path).is_some()
    }

    /// The first pattern that excludes `path` or one of its folders.
    #[must_use]
    pub fn matching_pattern(&self, path: &AssetPath) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }
        let mut current = Some(path.as_str());
        while let Some(candidate) = current {
            if candidate.is_empty() {
                break;
            }
            if let Some(pattern) = self
                .patterns
                .iter()
                .find(|pattern| pattern.compiled.is_match(candidate))
            {
                return Some(&pattern.original);
            }
            current = candidate.rfind('/').map(|idx| &candidate[..idx]);
        }
        None
    }
}

/// Check that `pattern` is a usable exclusion glob.
pub fn validate_glob_pattern(pattern: &str) -> Result<()> {
    glob_to_regex(pattern).map(|_| ())
}

/// Convert a shell-style glob to an anchored, case-insensitive regex.
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let normalized = pattern.trim().replace('\\', "/");
    if normalized.is_empty() {
        return Err(AhcError::InvalidConfig {
            details: "exclusion pattern must not be empty".to_string(),
        });
    }

    let mut regex_str = String::with_capacity(normalized.len() * 2);
    regex_str.push_str("(?i)^");

    let chars: Vec<char> = normalized.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if i + 1 < chars.len() && chars[i + 1] == '*' => {
                if i + 2 < chars.len() && chars[i + 2] == '/' {
                    regex_str.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex_str.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                regex_str.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                regex_str.push_str("[^/]");
                i += 1;
            }
            '.' | '+' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '$' | '|' | '\\' => {
                regex_str.push('\\');
                regex_str.push(chars[i]);
                i += 1;
            }
            c => {
                regex_str.push(c);
                i += 1;
            }
        }
    }
    regex_str.push('$');

    Regex::new(&regex_str).map_err(|err| AhcError::InvalidConfig {
        details: format!("invalid exclusion pattern {pattern:?}: {err}"),
    })
}
