//! Definition of diagnostics displayed to users.

use std::fmt;

use cwl_ast::Range;

/// The source name attached to every diagnostic this crate produces.
pub const DIAGNOSTIC_SOURCE: &str = "Benten";

/// Represents the severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Severity {
    /// The diagnostic is displayed as an error.
    Error,
    /// The diagnostic is displayed as a warning.
    Warning,
    /// The diagnostic is displayed as an informational note.
    Note,
}

impl Severity {
    /// Returns `true` if the severity is [`Error`].
    ///
    /// [`Error`]: Severity::Error
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns `true` if the severity is [`Warning`].
    ///
    /// [`Warning`]: Severity::Warning
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Note => write!(f, "note"),
        }
    }
}

/// Represents a diagnostic to display to the user.
///
/// Structural problems in a document are always diagnostics, never `Err`
/// values; the walk that found them continues to completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    severity: Severity,
    /// The diagnostic message.
    message: String,
    /// The source range the diagnostic is attached to.
    range: Range,
}

impl Diagnostic {
    /// Creates a new diagnostic error with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            range: Range::default(),
        }
    }

    /// Creates a new diagnostic warning with the given message.
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            range: Range::default(),
        }
    }

    /// Creates a new diagnostic note with the given message.
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            message: message.into(),
            range: Range::default(),
        }
    }

    /// Sets the source range of the diagnostic.
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Gets the severity of the diagnostic.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Gets the message of the diagnostic.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Gets the source range of the diagnostic.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Converts the diagnostic to an LSP diagnostic.
    pub fn to_lsp(&self) -> lsp_types::Diagnostic {
        let severity = match self.severity {
            Severity::Error => lsp_types::DiagnosticSeverity::ERROR,
            Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
            Severity::Note => lsp_types::DiagnosticSeverity::INFORMATION,
        };

        lsp_types::Diagnostic {
            range: range_to_lsp(self.range),
            severity: Some(severity),
            message: self.message.clone(),
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            ..Default::default()
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{severity}[{range}]: {message}",
            severity = self.severity,
            range = self.range,
            message = self.message
        )
    }
}

/// Converts a source position to an LSP position.
pub fn position_to_lsp(position: cwl_ast::Position) -> lsp_types::Position {
    lsp_types::Position {
        line: position.line,
        character: position.column,
    }
}

/// Converts a source range to an LSP range.
pub fn range_to_lsp(range: Range) -> lsp_types::Range {
    lsp_types::Range {
        start: position_to_lsp(range.start),
        end: position_to_lsp(range.end),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn converts_to_lsp() {
        let diagnostic = Diagnostic::warning("Unknown field: foo").with_range(Range::new(
            cwl_ast::Position::new(3, 2),
            cwl_ast::Position::new(3, 5),
        ));

        let lsp = diagnostic.to_lsp();
        assert_eq!(lsp.severity, Some(lsp_types::DiagnosticSeverity::WARNING));
        assert_eq!(lsp.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert_eq!(lsp.range.start.line, 3);
        assert_eq!(lsp.range.start.character, 2);
        assert_eq!(lsp.message, "Unknown field: foo");
    }
}
