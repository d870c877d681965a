//! Retry and syntax-aware fallback around [`ResolutionEngine`].
//!
//! ```text
//! Probing(n) ──found──▶ Resolved
//!     │ none, n < max
//!     ▼
//! AwaitingRetry(n, delay) ──▶ Probing(n + 1)
//!     │ none, n == max
//!     ▼
//! FallbackDot ──found──▶ Resolved
//!     ▼
//! FallbackSymbol ──found──▶ Resolved
//!     ▼
//! Unknown
//! ```

use std::time::Duration;
use tracing::debug;

use crate::config::RetryConfig;
use crate::resolution::ResolutionEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionPhase {
    /// `attempt` counts from 1.
    Probing { attempt: u32 },
    AwaitingRetry { attempt: u32, delay: Duration },
    FallbackDot,
    FallbackSymbol,
    Resolved(String),
    Unknown,
}

impl ResolutionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Unknown)
    }

    pub fn into_type_name(self) -> Option<String> {
        match self {
            Self::Resolved(type_name) => Some(type_name),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RetryResolver {
    engine: ResolutionEngine,
    policy: RetryConfig,
}

impl RetryResolver {
    pub fn new(engine: ResolutionEngine, policy: RetryConfig) -> Self {
        Self { engine, policy }
    }

    pub fn engine(&self) -> &ResolutionEngine {
        &self.engine
    }

    pub async fn resolve(&self, line: u32, col: u32) -> Option<String> {
        let (type_name, _) = self.resolve_traced(line, col).await;
        type_name
    }

    /// Same as [`Self::resolve`], also returning every phase visited.
    pub async fn resolve_traced(&self, line: u32, col: u32) -> (Option<String>, Vec<ResolutionPhase>) {
        let initial_delay = self.policy.initial_delay();
        if !initial_delay.is_zero() {
            tokio::time::sleep(initial_delay).await;
        }

        let mut phase = ResolutionPhase::Probing { attempt: 1 };
        let mut visited = vec![phase.clone()];
        while !phase.is_terminal() {
            phase = self.step(phase, line, col).await;
            visited.push(phase.clone());
        }

        debug!("Resolution at {}:{} went through {:?}", line, col, visited);
        (phase.into_type_name(), visited)
    }

    async fn step(&self, phase: ResolutionPhase, line: u32, col: u32) -> ResolutionPhase {
        match phase {
            ResolutionPhase::Probing { attempt } => {
                match self.engine.resolve_at_position(line, col).await {
                    Some(type_name) => ResolutionPhase::Resolved(type_name),
                    None if attempt <= self.policy.max_retries => {
                        ResolutionPhase::AwaitingRetry {
                            attempt,
                            delay: self.policy.delay_before_retry(attempt),
                        }
                    }
                    None => ResolutionPhase::FallbackDot,
                }
            }
            ResolutionPhase::AwaitingRetry { attempt, delay } => {
                tokio::time::sleep(delay).await;
                ResolutionPhase::Probing {
                    attempt: attempt + 1,
                }
            }
            ResolutionPhase::FallbackDot => match self.dot_probe(line, col) {
                Some((content, receiver_col)) => {
                    match self.engine.probe(&content, line, receiver_col).await {
                        Some(type_name) => ResolutionPhase::Resolved(type_name),
                        None => ResolutionPhase::FallbackSymbol,
                    }
                }
                None => ResolutionPhase::FallbackSymbol,
            },
            ResolutionPhase::FallbackSymbol => {
                if !self.follows_symbol_shorthand(line, col) {
                    return ResolutionPhase::Unknown;
                }
                match self.engine.resolve_at_position(line, col - 2).await {
                    Some(type_name) => ResolutionPhase::Resolved(type_name),
                    None => ResolutionPhase::Unknown,
                }
            }
            terminal => terminal,
        }
    }

    /// Document with the dot before the cursor blanked, plus the receiver
    /// column, when the cursor sits right after `receiver.`.
    fn dot_probe(&self, line: u32, col: u32) -> Option<(String, u32)> {
        if col <= 2 {
            return None;
        }
        let session = self.engine.session();
        let line_content = session.line_content(line)?;
        let dot_index = (col - 2) as usize;
        if line_content.chars().nth(dot_index) != Some('.') {
            return None;
        }

        let blanked: String = line_content
            .chars()
            .enumerate()
            .map(|(i, c)| if i == dot_index { ' ' } else { c })
            .collect();
        let content = replace_line(&session.document_text(), line, &blanked)?;
        Some((content, col - 2))
    }

    fn follows_symbol_shorthand(&self, line: u32, col: u32) -> bool {
        if col <= 2 {
            return false;
        }
        let Some(line_content) = self.engine.session().line_content(line) else {
            return false;
        };
        let mut before = line_content.chars().skip((col - 3) as usize);
        before.next() == Some('&') && before.next() == Some(':')
    }
}

/// `text` with its 1-based `line` replaced by `replacement`.
fn replace_line(text: &str, line: u32, replacement: &str) -> Option<String> {
    let index = line.checked_sub(1)? as usize;
    let mut lines: Vec<&str> = text.split('\n').collect();
    *lines.get_mut(index)? = replacement;
    Some(lines.join("\n"))
}
