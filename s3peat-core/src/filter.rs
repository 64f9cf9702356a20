//! Include/exclude filtering of discovered paths.

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;

/// Decides whether a discovered file takes part in a run.
///
/// A path is included iff (there are no include patterns OR at least one
/// include pattern matches) AND no exclude pattern matches. Patterns use
/// search semantics: a match anywhere in the path counts.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl PathFilter {
    /// Compile include and exclude patterns.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self, ConfigError> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Build a filter from already compiled expressions.
    pub fn from_regexes(include: Vec<Regex>, exclude: Vec<Regex>) -> Self {
        Self { include, exclude }
    }

    /// Returns true when `path` passes the include gate and no exclude matches.
    pub fn should_include(&self, path: &str) -> bool {
        if !self.include.is_empty() && !self.include.iter().any(|re| re.is_match(path)) {
            return false;
        }
        if let Some(re) = self.exclude.iter().find(|re| re.is_match(path)) {
            debug!(path, pattern = re.as_str(), "Excluded by pattern");
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            let pattern = p.as_ref();
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(include: &[&str], exclude: &[&str]) -> PathFilter {
        PathFilter::new(include, exclude).unwrap()
    }

    #[test]
    fn empty_filter_includes_everything() {
        let f = filter(&[], &[]);
        assert!(f.is_empty());
        assert!(f.should_include("any/path.bin"));
    }

    #[test]
    fn include_uses_search_semantics() {
        let f = filter(&[r"rst$|py$|LICENSE"], &[]);
        assert!(f.should_include("README.rst"));
        assert!(f.should_include("s3peat/scripts.py"));
        assert!(f.should_include("LICENSE"));
        assert!(!f.should_include("setup.cfg"));
    }

    #[test]
    fn any_include_is_enough() {
        let f = filter(&[r"\.txt$", r"^docs/"], &[]);
        assert!(f.should_include("docs/index.html"));
        assert!(f.should_include("notes.txt"));
        assert!(!f.should_include("src/main.rs"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let f = filter(&[r"\.txt$"], &["file2"]);
        assert!(f.should_include("file1.txt"));
        assert!(!f.should_include("file2.txt"));
    }

    #[test]
    fn exclude_only() {
        let f = filter(&[], &["subdir"]);
        assert!(f.should_include("file1.txt"));
        assert!(!f.should_include("subdir/nested/file4.txt"));
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let err = PathFilter::new(&["("], &[]).unwrap_err();
        match err {
            ConfigError::InvalidPattern { pattern, .. } => assert_eq!(pattern, "("),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
