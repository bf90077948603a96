//! ``src/search/matcher.rs``
//!
//! # Search predicate
//!
//! A pattern is compiled once per search and then tested against entry
//! names. Case folding is decided from the pattern itself under smart case:
//! any uppercase letter in the pattern makes the match exact.

use globset::{GlobBuilder, GlobMatcher};

use crate::config::SearchOptions;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Insensitive,
    Smart,
    Exact,
}

impl CaseMode {
    #[must_use]
    pub const fn from_flags(ignore_case: bool, smart_case: bool) -> Self {
        match (ignore_case, smart_case) {
            (false, _) => Self::Exact,
            (true, true) => Self::Smart,
            (true, false) => Self::Insensitive,
        }
    }

    fn folds(self, pattern: &str) -> bool {
        match self {
            Self::Insensitive => true,
            Self::Smart => !pattern.chars().any(char::is_uppercase),
            Self::Exact => false,
        }
    }
}

#[derive(Debug, Clone)]
enum PatternKind {
    Substring(String),
    Glob(GlobMatcher),
}

#[derive(Debug, Clone)]
pub struct Matcher {
    kind: PatternKind,
    fold: bool,
}

impl Matcher {
    /// Compile `pattern`. Only glob patterns can fail.
    pub fn new(pattern: &str, opts: &SearchOptions) -> Result<Self, AppError> {
        let fold = CaseMode::from_flags(opts.ignore_case, opts.smart_case).folds(pattern);
        let pattern = if fold {
            pattern.to_lowercase()
        } else {
            pattern.to_string()
        };

        let kind = if opts.glob_search {
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| AppError::invalid_pattern(pattern.as_str(), e.kind().to_string()))?;

            PatternKind::Glob(glob.compile_matcher())
        } else {
            PatternKind::Substring(pattern)
        };

        Ok(Self { kind, fold })
    }

    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        let folded;
        let name = if self.fold {
            folded = name.to_lowercase();
            folded.as_str()
        } else {
            name
        };

        match &self.kind {
            PatternKind::Substring(p) => name.contains(p.as_str()),
            PatternKind::Glob(g) => g.is_match(name),
        }
    }
}

/// One-off match of `pattern` against `name`.
pub fn match_name(pattern: &str, name: &str, opts: &SearchOptions) -> Result<bool, AppError> {
    Ok(Matcher::new(pattern, opts)?.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(ignore_case: bool, smart_case: bool, glob_search: bool) -> SearchOptions {
        SearchOptions {
            ignore_case,
            smart_case,
            glob_search,
            wrap_scan: true,
        }
    }

    #[test]
    fn test_case_modes() {
        let smart = opts(true, true, false);
        assert!(match_name("read", "README.md", &smart).unwrap());
        assert!(!match_name("Read", "README.md", &smart).unwrap());
        assert!(match_name("READ", "README.md", &smart).unwrap());

        let insensitive = opts(true, false, false);
        assert!(match_name("Read", "README.md", &insensitive).unwrap());

        let exact = opts(false, true, false);
        assert!(!match_name("read", "README.md", &exact).unwrap());
        assert!(match_name("EAD", "README.md", &exact).unwrap());
    }

    #[test]
    fn test_glob_matches_whole_name() {
        let glob = opts(true, true, true);
        assert!(match_name("*.rs", "main.rs", &glob).unwrap());
        assert!(!match_name("*.rs", "main.rsx", &glob).unwrap());
        assert!(match_name("ma?n.*", "MAIN.RS", &glob).unwrap());
        assert!(!match_name("main", "main.rs", &glob).unwrap());
    }

    #[test]
    fn test_bad_glob_is_an_error() {
        let err = Matcher::new("[abc", &opts(true, true, true)).unwrap_err();
        assert!(matches!(err, AppError::InvalidPattern { .. }));
    }
}
