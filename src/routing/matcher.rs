//! Path matching logic.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries
//! - Detect static file paths (anything with an extension)
//! - Locate the analytics ingest prefix, with or without a leading country segment
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api` matches `/api` and `/api/...`, never `/apiary`
//! - No regex to guarantee O(n) matching

/// Trait for matching request paths against conditions.
pub trait PathMatcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches a path prefix on a segment boundary.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefix: String,
}

impl PrefixMatcher {
    /// Trailing slashes on the configured prefix are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_end_matches('/');
        Self {
            prefix: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    /// Remainder of `path` after the prefix, without its leading slash.
    /// `None` when the prefix does not match.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some("")
        } else {
            rest.strip_prefix('/')
        }
    }
}

impl PathMatcher for PrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }
}

/// Matches paths that name a file (contain a `.`).
#[derive(Debug, Clone, Default)]
pub struct ExtensionMatcher;

impl PathMatcher for ExtensionMatcher {
    fn matches(&self, path: &str) -> bool {
        path.contains('.')
    }
}

/// Combines multiple matchers with OR semantics.
#[derive(Debug)]
pub struct AnyMatcher {
    matchers: Vec<Box<dyn PathMatcher>>,
}

impl AnyMatcher {
    pub fn new(matchers: Vec<Box<dyn PathMatcher>>) -> Self {
        Self { matchers }
    }
}

impl PathMatcher for AnyMatcher {
    fn matches(&self, path: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(path))
    }
}

/// Paths that skip region handling: static files and internal prefixes.
pub fn bypass_matcher(prefixes: &[String]) -> AnyMatcher {
    let mut matchers: Vec<Box<dyn PathMatcher>> = vec![Box::new(ExtensionMatcher)];
    matchers.extend(
        prefixes
            .iter()
            .map(|p| Box::new(PrefixMatcher::new(p.as_str())) as Box<dyn PathMatcher>),
    );
    AnyMatcher::new(matchers)
}

/// Finds the analytics ingest prefix in a path.
#[derive(Debug, Clone)]
pub struct IngestMatcher {
    prefixes: Vec<PrefixMatcher>,
}

impl IngestMatcher {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(PrefixMatcher::new).collect(),
        }
    }

    /// Sub-path below the ingest prefix.
    ///
    /// `/ph/e` and `/dk/ph/e` both yield `e`; `/ph` yields an empty sub-path.
    pub fn sub_path<'a>(&self, path: &'a str) -> Option<&'a str> {
        if let Some(rest) = self.strip_any(path) {
            return Some(rest);
        }

        // One leading segment (a country code, valid or not) is tolerated.
        let after_first = path.strip_prefix('/')?;
        let slash = after_first.find('/')?;
        if slash == 0 {
            return None;
        }
        self.strip_any(&after_first[slash..])
    }

    fn strip_any<'a>(&self, path: &'a str) -> Option<&'a str> {
        self.prefixes.iter().find_map(|p| p.strip(path))
    }
}

impl PathMatcher for IngestMatcher {
    fn matches(&self, path: &str) -> bool {
        self.sub_path(path).is_some()
    }
}
