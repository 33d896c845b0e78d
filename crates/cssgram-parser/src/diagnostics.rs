use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A problem found while parsing, located by byte offsets `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub from: usize,
    pub to: usize,
    pub message: String,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(from: usize, to: usize, message: impl Into<String>) -> Self {
        Self {
            from,
            to,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    pub fn warning(from: usize, to: usize, message: impl Into<String>) -> Self {
        Self {
            from,
            to,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}, {}): {}", self.severity, self.from, self.to, self.message)
    }
}

/// Ordered diagnostics list. An error with the same range and message as an
/// earlier one is dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct Diagnostics {
    items: Vec<Diagnostic>,
    errors: HashSet<(usize, usize, String)>,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() && !self.errors.insert(Self::key(&diagnostic)) {
            return;
        }
        self.items.push(diagnostic);
    }

    fn key(diagnostic: &Diagnostic) -> (usize, usize, String) {
        (diagnostic.from, diagnostic.to, diagnostic.message.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Drop everything pushed after the first `len` items, forgetting their
    /// keys too.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.items.len() {
            return;
        }
        for diagnostic in self.items.drain(len..) {
            if diagnostic.is_error() {
                self.errors.remove(&Self::key(&diagnostic));
            }
        }
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_duplicate_error_is_dropped() {
        let mut list = Diagnostics::default();
        list.push(Diagnostic::error(3, 4, "first"));
        list.push(Diagnostic::error(3, 4, "second"));
        list.push(Diagnostic::error(3, 5, "first"));
        list.push(Diagnostic::error(3, 4, "first"));
        let messages: Vec<String> = list.into_vec().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second", "first"]);
    }

    #[test]
    fn test_warnings_are_not_deduplicated_against_errors() {
        let mut list = Diagnostics::default();
        list.push(Diagnostic::error(0, 1, "error"));
        list.push(Diagnostic::warning(0, 1, "warning"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_truncate() {
        let mut list = Diagnostics::default();
        list.push(Diagnostic::error(0, 1, "a"));
        list.push(Diagnostic::error(1, 2, "b"));
        list.truncate(1);
        assert_eq!(list.len(), 1);
        list.truncate(5);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_truncated_errors_can_be_pushed_again() {
        let mut list = Diagnostics::default();
        list.push(Diagnostic::error(0, 1, "a"));
        list.push(Diagnostic::error(1, 2, "b"));
        list.truncate(0);
        list.push(Diagnostic::error(1, 2, "b"));
        list.push(Diagnostic::error(0, 1, "a"));
        assert_eq!(list.len(), 2);
        list.push(Diagnostic::error(0, 1, "a"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_many_distinct_errors() {
        let mut list = Diagnostics::default();
        for i in 0..200_000 {
            list.push(Diagnostic::error(i, i + 1, "Unexpected token"));
        }
        for i in 0..200_000 {
            list.push(Diagnostic::error(i, i + 1, "Unexpected token"));
        }
        assert_eq!(list.len(), 200_000);
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::warning(0, 8, "@charset must be the first rule");
        assert_eq!(d.to_string(), "warning [0, 8): @charset must be the first rule");
    }
}
