//! Collected problems of a conversion run.
//!
//! A *failure* aborted the conversion of one page; a *skip* dropped a single
//! input item (for example a degenerate table cell) while the page itself
//! was still converted.

use std::fmt;

use crate::error::ConvertError;

#[derive(Debug)]
pub enum Diagnostic {
    Failed {
        /// Annotation source the failure belongs to
        source: String,
        error: ConvertError,
    },
    Skipped {
        source: String,
        subject: String,
        reason: String,
    },
}

impl Diagnostic {
    pub fn source(&self) -> &str {
        match self {
            Diagnostic::Failed { source, .. } | Diagnostic::Skipped { source, .. } => source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Diagnostic::Failed { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Failed { source, error } => {
                write!(f, "FAILED  {source}: [{}] {error}", error.kind())
            }
            Diagnostic::Skipped {
                source,
                subject,
                reason,
            } => write!(f, "SKIPPED {source}: {subject}: {reason}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, source: impl Into<String>, error: ConvertError) {
        self.entries.push(Diagnostic::Failed {
            source: source.into(),
            error,
        });
    }

    pub fn skip(
        &mut self,
        source: impl Into<String>,
        subject: impl Into<String>,
        reason: impl Into<String>,
    ) {
        self.entries.push(Diagnostic::Skipped {
            source: source.into(),
            subject: subject.into(),
            reason: reason.into(),
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Errors that aborted a page, in input order
    pub fn failures(&self) -> impl Iterator<Item = &ConvertError> {
        self.entries.iter().filter_map(|d| match d {
            Diagnostic::Failed { error, .. } => Some(error),
            Diagnostic::Skipped { .. } => None,
        })
    }

    pub fn failure_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_failure()).count()
    }

    pub fn skip_count(&self) -> usize {
        self.entries.len() - self.failure_count()
    }

    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(Diagnostic::is_failure)
    }

    /// Human-readable report, one line per entry
    pub fn summary(&self) -> String {
        let mut out = format!(
            "{} failed, {} skipped\n",
            self.failure_count(),
            self.skip_count()
        );
        for entry in &self.entries {
            out.push_str("  ");
            out.push_str(&entry.to_string());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_every_entry() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.skip("pc-0001.xml", "cell r2c3", "only 2 point(s)");
        diagnostics.fail(
            "manifest.json#2",
            ConvertError::MissingImage {
                name: "page2.jpg".to_string(),
            },
        );

        assert_eq!(diagnostics.failure_count(), 1);
        assert_eq!(diagnostics.skip_count(), 1);
        let summary = diagnostics.summary();
        assert!(summary.starts_with("1 failed, 1 skipped"));
        assert!(summary.contains("SKIPPED pc-0001.xml: cell r2c3"));
        assert!(summary.contains("[MissingImageError] missing image: page2.jpg"));
    }

    #[test]
    fn test_skips_alone_are_not_failures() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.skip("a.xml", "cell r0c0", "degenerate");
        assert!(!diagnostics.is_empty());
        assert!(!diagnostics.has_failures());
        assert_eq!(diagnostics.failures().count(), 0);
    }
}
