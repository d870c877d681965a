//! Lightweight call-site detection.
//!
//! This is pattern matching over single lines, not a parser. It over- and
//! under-matches around string and regex literals; unresolvable hits simply
//! end up `unknown` in the store.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::types::Occurrence;

const COMMENT_MARKER: char = '#';

const KEYWORD_BLACKLIST: &[&str] = &[
    "if", "def", "class", "module", "end", "do", "yield", "begin", "rescue", "ensure", "elsif",
    "else", "unless", "while", "until", "case", "when", "then", "return",
];

lazy_static! {
    // `.name`, `name(`/`name {`, or `name do`.
    static ref CALL_SITE: Regex = Regex::new(
        r"\.([a-z_][a-zA-Z0-9_]*[!?]?)|\b([a-z_][a-zA-Z0-9_]*[!?]?)\s*[({]|\b([a-z_][a-zA-Z0-9_]*[!?]?)\s+do\b"
    )
    .expect("call-site pattern must compile");
}

/// Source of line text by zero-based index.
pub trait LineTextProvider {
    fn line_text(&self, index: usize) -> Option<&str>;
}

impl LineTextProvider for [String] {
    fn line_text(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }
}

impl LineTextProvider for Vec<String> {
    fn line_text(&self, index: usize) -> Option<&str> {
        self.as_slice().line_text(index)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    /// Scans the given zero-based lines. Lines the provider does not know
    /// about are skipped and absent from the result.
    pub fn scan<P>(&self, lines: &BTreeSet<usize>, provider: &P) -> BTreeMap<usize, Vec<Occurrence>>
    where
        P: LineTextProvider + ?Sized,
    {
        let mut results = BTreeMap::new();
        for &index in lines {
            match provider.line_text(index) {
                Some(text) => {
                    results.insert(index, scan_line(text, index as u32 + 1));
                }
                None => debug!("Skipping scan of line {} outside the document", index),
            }
        }
        results
    }
}

/// Finds occurrences in one line; `line_number` is 1-based.
pub fn scan_line(text: &str, line_number: u32) -> Vec<Occurrence> {
    let code = blank_comment(text);

    CALL_SITE
        .captures_iter(&code)
        .filter_map(|captures| (1..=3).find_map(|group| captures.get(group)))
        .filter(|name| !KEYWORD_BLACKLIST.contains(&name.as_str()))
        .map(|name| {
            let col = code[..name.start()].chars().count() as u32 + 1;
            Occurrence::new(name.as_str(), line_number, col)
        })
        .collect()
}

/// Replaces everything from the first comment marker with spaces, one per
/// character, so columns of the remaining code are unchanged.
pub fn blank_comment(text: &str) -> String {
    match text.find(COMMENT_MARKER) {
        Some(index) => {
            let blanked = text[index..].chars().count();
            let mut code = String::with_capacity(text.len());
            code.push_str(&text[..index]);
            code.extend(std::iter::repeat_n(' ', blanked));
            code
        }
        None => text.to_string(),
    }
}
