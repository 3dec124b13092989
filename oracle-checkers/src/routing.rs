//! Literal route matching and the prefix-containment law

use oracle::{CheckError, InvariantChecker, Violation};
use thiserror::Error;

/// Patterns registered by [`RouteTable::default`]
pub const DEFAULT_ROUTES: [&str; 3] = ["/prefix/abc.html", "/1/2/3/hi.json", "/hel/lo/wo/rl/d"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("route pattern {pattern:?} must start with '/'")]
    Relative { pattern: String },

    #[error("route pattern {pattern:?} has a parameter or wildcard segment")]
    Dynamic { pattern: String },
}

/// Collapse every run of `/` into a single slash
pub fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut previous_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        normalized.push(ch);
    }
    normalized
}

fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// A set of literal path patterns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    patterns: Vec<String>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Register a literal pattern. Patterns are stored normalized.
    pub fn register(&mut self, pattern: &str) -> Result<(), RouteError> {
        if !pattern.starts_with('/') {
            return Err(RouteError::Relative {
                pattern: pattern.to_string(),
            });
        }
        if pattern
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.contains('*'))
        {
            return Err(RouteError::Dynamic {
                pattern: pattern.to_string(),
            });
        }

        let normalized = strip_trailing_slash(&normalize_path(pattern)).to_string();
        if !self.patterns.contains(&normalized) {
            self.patterns.push(normalized);
        }
        Ok(())
    }

    pub fn with_patterns<'a>(
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, RouteError> {
        let mut table = Self::new();
        for pattern in patterns {
            table.register(pattern)?;
        }
        Ok(table)
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// First registered pattern whose segments equal the path's, ignoring
    /// one trailing slash on the path
    pub fn match_path(&self, path: &str) -> Option<&str> {
        let path = strip_trailing_slash(path);
        self.patterns
            .iter()
            .find(|pattern| pattern.split('/').eq(path.split('/')))
            .map(String::as_str)
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            patterns: DEFAULT_ROUTES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// A router that resolves a normalized path to the pattern it matched
pub trait PathMatcher {
    fn match_path(&self, path: &str) -> Option<&str>;
}

impl PathMatcher for RouteTable {
    fn match_path(&self, path: &str) -> Option<&str> {
        RouteTable::match_path(self, path)
    }
}

impl<M: PathMatcher + ?Sized> PathMatcher for &M {
    fn match_path(&self, path: &str) -> Option<&str> {
        (**self).match_path(path)
    }
}

/// Any pattern matching a normalized path is a literal prefix of it
#[derive(Debug, Clone)]
pub struct PrefixContainmentChecker<M = RouteTable> {
    matcher: M,
}

impl<M: PathMatcher> PrefixContainmentChecker<M> {
    pub fn new(matcher: M) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &M {
        &self.matcher
    }
}

impl Default for PrefixContainmentChecker<RouteTable> {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}

impl<M: PathMatcher> InvariantChecker for PrefixContainmentChecker<M> {
    type Input = String;

    fn name(&self) -> &'static str {
        "prefix_containment"
    }

    fn check(&self, input: &String) -> Result<(), CheckError> {
        let path = normalize_path(input);
        match self.matcher.match_path(&path) {
            Some(pattern) if !path.starts_with(pattern) => Err(Violation::new(
                self.name(),
                format!("pattern {:?} matched a path it is not a prefix of", pattern),
            )
            .with_context(format!("raw {:?}, normalized {:?}", input, path))
            .into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/prefix//abc.html"), "/prefix/abc.html");
        assert_eq!(normalize_path("///a///b//"), "/a/b/");
        assert_eq!(normalize_path("no/slashes/doubled"), "no/slashes/doubled");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_match_ignores_one_trailing_slash() {
        let table = RouteTable::default();
        assert_eq!(table.match_path("/prefix/abc.html"), Some("/prefix/abc.html"));
        assert_eq!(table.match_path("/prefix/abc.html/"), Some("/prefix/abc.html"));
        assert_eq!(table.match_path("/prefix/abc.html//"), None);
        assert_eq!(table.match_path("prefix/abc.html"), None);
        assert_eq!(table.match_path("/prefix"), None);
    }

    #[test]
    fn test_register_rejects_dynamic_segments() {
        let mut table = RouteTable::new();
        assert!(matches!(
            table.register("/users/:id"),
            Err(RouteError::Dynamic { .. })
        ));
        assert!(matches!(
            table.register("/static/*path"),
            Err(RouteError::Dynamic { .. })
        ));
        assert!(matches!(
            table.register("users"),
            Err(RouteError::Relative { .. })
        ));
        assert!(table.patterns().is_empty());
    }

    #[test]
    fn test_register_normalizes() {
        let table = RouteTable::with_patterns(["/a//b/", "/a/b"]).unwrap();
        assert_eq!(table.patterns(), &["/a/b".to_string()]);
    }

    #[test]
    fn test_doubled_slash_matches_after_normalization() {
        let checker = PrefixContainmentChecker::new(RouteTable::default());
        let path = "/prefix//abc.html".to_string();
        assert!(checker.check(&path).is_ok());

        let normalized = normalize_path(&path);
        let pattern = checker.matcher().match_path(&normalized).unwrap();
        assert!(normalized.starts_with(pattern));
    }

    #[test]
    fn test_unmatched_path_holds() {
        let checker = PrefixContainmentChecker::new(RouteTable::default());
        assert!(checker.check(&"/nothing/here".to_string()).is_ok());
    }

    /// Matches on segment count and final segment only
    struct LooseMatcher(Vec<String>);

    impl PathMatcher for LooseMatcher {
        fn match_path(&self, path: &str) -> Option<&str> {
            let wanted: Vec<&str> = path.split('/').collect();
            self.0
                .iter()
                .find(|pattern| {
                    let segments: Vec<&str> = pattern.split('/').collect();
                    segments.len() == wanted.len() && segments.last() == wanted.last()
                })
                .map(String::as_str)
        }
    }

    #[test]
    fn test_loose_matcher_is_violation() {
        let checker = PrefixContainmentChecker::new(LooseMatcher(vec![
            "/prefix/abc.html".to_string(),
        ]));
        assert!(checker.check(&"/prefix/abc.html".to_string()).is_ok());

        match checker.check(&"/other//abc.html".to_string()) {
            Err(CheckError::Violation(violation)) => {
                assert_eq!(violation.property, "prefix_containment");
                assert!(violation.message.contains("/prefix/abc.html"));
                assert_eq!(
                    violation.context.as_deref(),
                    Some(r#"raw "/other//abc.html", normalized "/other/abc.html""#)
                );
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }

    #[test]
    fn test_borrowed_table_is_a_matcher() {
        let table = RouteTable::with_patterns(["/1/2/3/hi.json"]).unwrap();
        let checker = PrefixContainmentChecker::new(&table);
        assert!(checker.check(&"/1//2/3/hi.json/".to_string()).is_ok());
        assert_eq!(checker.matcher().match_path("/1/2/3/hi.json"), Some("/1/2/3/hi.json"));
    }
}
