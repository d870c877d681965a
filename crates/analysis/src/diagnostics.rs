use event_bus::types::diagnostic::TSDiagnosticMarker;
use lsp_types::{Diagnostic, DiagnosticSeverity, PublishDiagnosticsParams};
use serde::{Deserialize, Serialize};

pub const TYPE_PROFILER_SOURCE: &str = "TypeProf";
pub const SYNTAX_CHECK_SOURCE: &str = "RubySyntax";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSeverity {
    Error,
    Warning,
    Info,
    Hint,
}

impl MarkerSeverity {
    /// Unknown or missing severities are shown as info.
    pub fn from_lsp(severity: Option<DiagnosticSeverity>) -> Self {
        match severity {
            Some(s) if s == DiagnosticSeverity::ERROR => Self::Error,
            Some(s) if s == DiagnosticSeverity::WARNING => Self::Warning,
            Some(s) if s == DiagnosticSeverity::HINT => Self::Hint,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Hint => "hint",
        }
    }
}

/// Editor marker with 1-based positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMarker {
    pub severity: MarkerSeverity,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub message: String,
    pub source: String,
}

impl DiagnosticMarker {
    fn from_diagnostic(diagnostic: &Diagnostic, severity: MarkerSeverity, source: &str) -> Self {
        let range = diagnostic.range;
        Self {
            severity,
            start_line: range.start.line.saturating_add(1),
            start_column: range.start.character.saturating_add(1),
            end_line: range.end.line.saturating_add(1),
            end_column: range.end.character.saturating_add(1),
            message: diagnostic.message.clone(),
            source: source.to_string(),
        }
    }

    pub fn to_ts(&self) -> TSDiagnosticMarker {
        TSDiagnosticMarker {
            severity: self.severity.as_str().to_string(),
            start_line: self.start_line,
            start_column: self.start_column,
            end_line: self.end_line,
            end_column: self.end_column,
            message: self.message.clone(),
            source: self.source.clone(),
        }
    }
}

pub fn markers_from_publish(params: &PublishDiagnosticsParams) -> Vec<DiagnosticMarker> {
    params
        .diagnostics
        .iter()
        .map(|diagnostic| {
            DiagnosticMarker::from_diagnostic(
                diagnostic,
                MarkerSeverity::from_lsp(diagnostic.severity),
                TYPE_PROFILER_SOURCE,
            )
        })
        .collect()
}

/// Payload of the server's `rubpad/syntaxCheck` notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntaxCheckParams {
    pub valid: bool,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// A valid check yields no markers, which clears previous syntax errors.
pub fn markers_from_syntax_check(params: &SyntaxCheckParams) -> Vec<DiagnosticMarker> {
    if params.valid {
        return Vec::new();
    }
    params
        .diagnostics
        .iter()
        .map(|diagnostic| {
            DiagnosticMarker::from_diagnostic(
                diagnostic,
                MarkerSeverity::Error,
                SYNTAX_CHECK_SOURCE,
            )
        })
        .collect()
}
