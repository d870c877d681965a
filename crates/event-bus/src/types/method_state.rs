use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Resolution state of one method occurrence, as seen by presentation layers.
#[derive(Serialize, Deserialize, TS, Default, Clone, Debug, PartialEq)]
#[ts(export, export_to = "../../../bindings/method_state.ts")]
pub struct TSMethodState {
    pub name: String,
    pub line: u32,
    pub col: u32,
    /// One of `pending`, `resolved`, `unknown`.
    pub status: String,
    pub class_name: Option<String>,
    pub url: Option<String>,
    pub separator: Option<String>,
}
