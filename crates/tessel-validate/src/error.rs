use std::fmt;

/// One structural or boundary problem, located by a dotted JSON path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    /// Path of the offending field, e.g. `scope.realm` or `events[2].payload.node_id`.
    pub path: String,
    pub message: String,
}

impl Problem {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Prefix the path, e.g. with `events[3]`.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.path = if self.path.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}.{}", self.path)
        };
        self
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Collector used by every check; nothing stops at the first problem.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Problems(Vec<Problem>);

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(Problem::new(path, message));
    }

    /// Append `other`, prefixing each path.
    pub fn absorb(&mut self, prefix: &str, other: Problems) {
        self.0
            .extend(other.0.into_iter().map(|p| p.prefixed(prefix)));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Problem> {
        self.0
    }
}

/// Aggregated validation failure. Nothing is persisted when this is raised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Envelope or operation shape violations.
    #[error("structural validation failed with {} problem(s): {}", .0.len(), join(.0))]
    Structural(Vec<Problem>),

    /// Numeric data under `authority: source`. Only raised for structurally
    /// valid events.
    #[error("boundary validation failed with {} problem(s): {}", .0.len(), join(.0))]
    Boundary(Vec<Problem>),
}

impl ValidationError {
    pub fn problems(&self) -> &[Problem] {
        match self {
            Self::Structural(p) | Self::Boundary(p) => p,
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural(_))
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self, Self::Boundary(_))
    }

    /// Problems rendered as `path: message` strings.
    pub fn messages(&self) -> Vec<String> {
        self.problems().iter().map(Problem::to_string).collect()
    }
}

fn join(problems: &[Problem]) -> String {
    problems
        .iter()
        .map(Problem::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from loading validator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid validator config: {0}")]
    Parse(#[from] toml::de::Error),
}
