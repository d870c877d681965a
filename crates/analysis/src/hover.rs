//! Extraction of a class name from hover payloads.
//!
//! The server answers with markdown that is either a fenced signature
//! (`String#upcase: -> String`), a bare signature, a bare type, or a symbol
//! literal. Patterns are tried in that order.

use lazy_static::lazy_static;
use lsp_types::{Hover, HoverContents, MarkedString};
use regex::Regex;

lazy_static! {
    static ref FENCED_SIGNATURE: Regex =
        Regex::new(r"```(?:ruby)?\n([A-Z][a-zA-Z0-9_:]*)(?:[#.][^\n]*)?\n```")
            .expect("fenced signature pattern must compile");
    static ref BARE_SIGNATURE: Regex =
        Regex::new(r"^([^#.\n]+)[#.]").expect("bare signature pattern must compile");
    static ref BARE_TYPE: Regex = Regex::new(
        r"^([A-Z][a-zA-Z0-9_:]*(?:\[.*\])?|\[.*\]|nil|true|false|untyped|void)$"
    )
    .expect("bare type pattern must compile");
    static ref SYMBOL_LITERAL: Regex =
        Regex::new(r"^:[a-zA-Z0-9_!?]+$").expect("symbol literal pattern must compile");
}

const SYMBOL_CLASS: &str = "Symbol";
const ARRAY_CLASS: &str = "Array";

/// Flattens any hover content shape into one markdown string.
pub fn hover_markdown(hover: &Hover) -> String {
    match &hover.contents {
        HoverContents::Markup(markup) => markup.value.clone(),
        HoverContents::Scalar(marked) => marked_string_value(marked),
        HoverContents::Array(items) => items
            .iter()
            .map(marked_string_value)
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn marked_string_value(marked: &MarkedString) -> String {
    match marked {
        MarkedString::String(value) => value.clone(),
        MarkedString::LanguageString(language_string) => language_string.value.clone(),
    }
}

pub fn class_name_from_hover(markdown: &str) -> Option<String> {
    let content = markdown.trim();
    if content.is_empty() {
        return None;
    }

    if let Some(captures) = FENCED_SIGNATURE.captures(content) {
        return normalize_type_name(&captures[1]);
    }

    if let Some(captures) = BARE_SIGNATURE.captures(content) {
        return normalize_type_name(captures[1].trim());
    }

    if BARE_TYPE.is_match(content) {
        return normalize_type_name(content);
    }

    if SYMBOL_LITERAL.is_match(content) {
        return Some(SYMBOL_CLASS.to_string());
    }

    None
}

/// Reduces a type expression to a plain class name, or `None` when the
/// server had no information.
pub fn normalize_type_name(name: &str) -> Option<String> {
    let name = name.trim();

    match name {
        "" | "untyped" | "void" => return None,
        "nil" => return Some("NilClass".to_string()),
        "true" => return Some("TrueClass".to_string()),
        "false" => return Some("FalseClass".to_string()),
        _ => {}
    }

    if name.starts_with('[') {
        return Some(ARRAY_CLASS.to_string());
    }

    let without_generics = match name.find('[') {
        Some(index) => &name[..index],
        None => name,
    };
    let last_segment = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .trim();

    if last_segment.is_empty() {
        None
    } else {
        Some(last_segment.to_string())
    }
}
