//! Which paths may be reached without authentication.

/// A single public path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    /// `"/auth/**"`: the prefix and everything below it.
    Prefix(String),
    Exact(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Prefix(prefix) => match path.strip_prefix(prefix.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
            PathPattern::Exact(exact) => exact == path,
        }
    }
}

/// Paths exempt from authentication. Everything else is protected.
#[derive(Debug, Clone, Default)]
pub struct RoutePolicy {
    public: Vec<PathPattern>,
}

impl RoutePolicy {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            public: patterns
                .into_iter()
                .map(|p| PathPattern::parse(p.as_ref()))
                .collect(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public.iter().any(|p| p.matches(path))
    }
}
