use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Editor marker with 1-based positions.
#[derive(Serialize, Deserialize, TS, Default, Clone, Debug, PartialEq)]
#[ts(export, export_to = "../../../bindings/diagnostic.ts")]
pub struct TSDiagnosticMarker {
    /// One of `error`, `warning`, `info`, `hint`.
    pub severity: String,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
    pub message: String,
    pub source: String,
}
