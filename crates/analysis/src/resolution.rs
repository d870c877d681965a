use std::sync::Arc;
use tracing::{debug, warn};

use crate::session::ServerSession;

const COMMENT_MARKER: char = '#';

/// Columns tried for a query at `col`: the column itself, one and two to the
/// left (cursor past the identifier, or past a following dot), then one to
/// the right (cursor just before the identifier).
pub fn fallback_columns(col: u32) -> Vec<u32> {
    let mut columns = vec![col];
    if col > 1 {
        columns.push(col - 1);
    }
    if col > 2 {
        columns.push(col - 2);
    }
    columns.push(col + 1);
    columns
}

/// True when `line` has a comment marker at or before the 1-based `col`.
pub fn is_inside_comment(line: &str, col: u32) -> bool {
    line.chars()
        .position(|c| c == COMMENT_MARKER)
        .is_some_and(|index| index < col as usize)
}

/// Single-shot type lookups. Lower-level failures are logged and reported as
/// `None`; callers never see an error.
#[derive(Clone)]
pub struct ResolutionEngine {
    session: Arc<ServerSession>,
}

impl ResolutionEngine {
    pub fn new(session: Arc<ServerSession>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<ServerSession> {
        &self.session
    }

    pub async fn resolve_at_position(&self, line: u32, col: u32) -> Option<String> {
        if let Some(content) = self.session.line_content(line) {
            if is_inside_comment(&content, col) {
                debug!("Skipping resolution inside comment at {}:{}", line, col);
                return None;
            }
        }

        for candidate in fallback_columns(col) {
            match self.session.type_at_position(line, candidate).await {
                Ok(Some(type_name)) => return Some(type_name),
                Ok(None) => {}
                Err(e) => {
                    warn!("Resolution at {}:{} failed: {}", line, candidate, e);
                    return None;
                }
            }
        }
        None
    }

    /// Resolves against `content` instead of the live document. The live text
    /// is restored on the server afterwards.
    pub async fn probe(&self, content: &str, line: u32, col: u32) -> Option<String> {
        match self
            .session
            .probe_with_temporary_content(content, line, &fallback_columns(col))
            .await
        {
            Ok(type_name) => type_name,
            Err(e) => {
                warn!("Probe at {}:{} failed: {}", line, col, e);
                None
            }
        }
    }
}
