use glob::{MatchOptions, Pattern};

use crate::error::SecurityConfigError;

const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Ant-style request path pattern.
///
/// `*` matches within one segment; a trailing `/**` matches the prefix
/// itself and everything below it.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Subtree(String),
    Glob(Pattern),
}

impl PathPattern {
    /// # Errors
    /// Returns `SecurityConfigError::InvalidPattern` for malformed patterns.
    pub fn new(pattern: &str) -> Result<Self, SecurityConfigError> {
        let matcher = match pattern.strip_suffix("/**") {
            Some(prefix) if !prefix.contains(['*', '?', '[']) => {
                Matcher::Subtree(prefix.to_owned())
            }
            _ => Matcher::Glob(Pattern::new(pattern).map_err(|source| {
                SecurityConfigError::InvalidPattern {
                    pattern: pattern.to_owned(),
                    source,
                }
            })?),
        };
        Ok(Self {
            source: pattern.to_owned(),
            matcher,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Subtree(prefix) => {
                prefix.is_empty()
                    || path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Matcher::Glob(p) => p.matches_with(path, OPTIONS),
        }
    }
}
