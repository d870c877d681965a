use lsp_types::{
    DidChangeTextDocumentParams, DidOpenTextDocumentParams, TextDocumentContentChangeEvent,
    TextDocumentItem, Url, VersionedTextDocumentIdentifier,
};

/// Client-side view of the single synchronised document.
///
/// `text` is always the live editor content. `stale` is set whenever the
/// server may hold something else (unflushed edits, or probe content that has
/// not been restored yet); the next flush then re-sends the live text.
#[derive(Debug)]
pub struct DocumentSync {
    uri: Url,
    language_id: String,
    version: i32,
    text: String,
    opened: bool,
    stale: bool,
}

impl DocumentSync {
    pub fn new(uri: Url, language_id: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version: 0,
            text: String::new(),
            opened: false,
            stale: false,
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// 1-based line lookup.
    pub fn line_content(&self, line: u32) -> Option<&str> {
        let index = line.checked_sub(1)? as usize;
        self.text.split('\n').nth(index)
    }

    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    pub fn open(&mut self, text: impl Into<String>) -> DidOpenTextDocumentParams {
        self.text = text.into();
        self.version += 1;
        self.opened = true;
        self.stale = false;
        DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: self.uri.clone(),
                language_id: self.language_id.clone(),
                version: self.version,
                text: self.text.clone(),
            },
        }
    }

    /// Records a new live text; the server learns about it on the next flush.
    pub fn update(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.stale = true;
        }
    }

    /// Full-content change carrying the live text, if the server is behind.
    pub fn take_flush(&mut self) -> Option<DidChangeTextDocumentParams> {
        if !self.opened || !self.stale {
            return None;
        }
        self.stale = false;
        let text = self.text.clone();
        Some(self.change_params(text))
    }

    /// Full-content change carrying `content` instead of the live text. The
    /// document stays stale until the next flush restores it.
    pub fn temporary_change(&mut self, content: &str) -> DidChangeTextDocumentParams {
        self.stale = true;
        self.change_params(content.to_string())
    }

    fn change_params(&mut self, text: String) -> DidChangeTextDocumentParams {
        self.version += 1;
        DidChangeTextDocumentParams {
            text_document: VersionedTextDocumentIdentifier {
                uri: self.uri.clone(),
                version: self.version,
            },
            content_changes: vec![TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text,
            }],
        }
    }
}
