use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
}

impl Severity {
    /// Errors and warnings survive retained mode; information does not.
    pub fn is_retained(self) -> bool {
        matches!(self, Self::Error | Self::Warning)
    }
}

/// One message reported by the compiler or the running script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub section: String,
    pub row: usize,
    pub column: usize,
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        section: impl Into<String>,
        row: usize,
        column: usize,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            section: section.into(),
            row,
            column,
            severity,
            message: message.into(),
        }
    }

    pub fn error(section: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(section, 0, 0, Severity::Error, message)
    }

    pub fn at(mut self, location: Option<SourceLocation>) -> Self {
        if let Some(location) = location {
            self.row = location.line;
            self.column = location.column;
        }
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({},{}) {}",
            self.section, self.row, self.column, self.message
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogMode {
    #[default]
    Immediate,
    Retained,
}

impl LogMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Retained => "retained",
        }
    }
}

#[cfg(test)]
mod types_tests {
    use super::*;

    #[test]
    fn diagnostic_display_matches_section_row_col_format() {
        let diagnostic = Diagnostic::new("main", 3, 14, Severity::Error, "Unknown variable");
        assert_eq!(diagnostic.to_string(), "main (3,14) Unknown variable");
    }

    #[test]
    fn at_overrides_position_only_when_location_is_known() {
        let unplaced = Diagnostic::error("immediate", "boom").at(None);
        assert_eq!((unplaced.row, unplaced.column), (0, 0));

        let placed = Diagnostic::error("immediate", "boom")
            .at(Some(SourceLocation { line: 2, column: 1 }));
        assert_eq!((placed.row, placed.column), (2, 1));
    }

    #[test]
    fn only_errors_and_warnings_are_retained() {
        assert!(Severity::Error.is_retained());
        assert!(Severity::Warning.is_retained());
        assert!(!Severity::Information.is_retained());
    }

    #[test]
    fn log_mode_serializes_lowercase() {
        let json = serde_json::to_string(&LogMode::Retained).expect("serialize");
        assert_eq!(json, "\"retained\"");
        assert_eq!(LogMode::default(), LogMode::Immediate);
    }
}
