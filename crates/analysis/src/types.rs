use serde::{Deserialize, Serialize};

/// A candidate call site found by the scanner. Positions are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub name: String,
    pub line: u32,
    pub col: u32,
}

impl Occurrence {
    pub fn new(name: impl Into<String>, line: u32, col: u32) -> Self {
        Self {
            name: name.into(),
            line,
            col,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    Pending,
    Resolved,
    Unknown,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationLink {
    pub class_name: String,
    pub url: String,
    pub separator: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInfo {
    pub class_name: String,
    pub documentation: Option<DocumentationLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionState {
    pub name: String,
    pub line: u32,
    pub col: u32,
    pub status: ResolutionStatus,
    pub info: Option<ResolvedInfo>,
}

impl ResolutionState {
    pub fn pending(occurrence: &Occurrence) -> Self {
        Self::from_occurrence(occurrence, ResolutionStatus::Pending, None)
    }

    pub fn resolved(occurrence: &Occurrence, info: ResolvedInfo) -> Self {
        Self::from_occurrence(occurrence, ResolutionStatus::Resolved, Some(info))
    }

    pub fn unknown(occurrence: &Occurrence) -> Self {
        Self::from_occurrence(occurrence, ResolutionStatus::Unknown, None)
    }

    fn from_occurrence(
        occurrence: &Occurrence,
        status: ResolutionStatus,
        info: Option<ResolvedInfo>,
    ) -> Self {
        Self {
            name: occurrence.name.clone(),
            line: occurrence.line,
            col: occurrence.col,
            status,
            info,
        }
    }
}

/// Maps a resolved receiver class and a method name to reference docs.
pub trait DocumentationLookup: Send + Sync {
    fn resolve(&self, class_name: &str, method_name: &str) -> Option<DocumentationLink>;
}

/// Inclusive, 1-based line range replaced by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start_line: u32,
    pub end_line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    pub range: LineRange,
    pub text: String,
}

impl ContentChange {
    pub fn new(start_line: u32, end_line: u32, text: impl Into<String>) -> Self {
        Self {
            range: LineRange {
                start_line,
                end_line,
            },
            text: text.into(),
        }
    }
}

/// One editor transaction; changes are applied in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub changes: Vec<ContentChange>,
}

impl ChangeEvent {
    pub fn single(change: ContentChange) -> Self {
        Self {
            changes: vec![change],
        }
    }
}
