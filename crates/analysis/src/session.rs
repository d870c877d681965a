//! The engine's conversation with the type server about its one document.
//!
//! Every server-facing sequence (flush then hover, probe then restore) runs
//! under `sync_gate`, so a probe's temporary content is never visible to an
//! unrelated hover. The document state itself sits behind a plain mutex that
//! is never held across an await, so editor updates never wait on the server.

use dashmap::DashMap;
use lsp_types::{
    ClientCapabilities, ExecuteCommandParams, Hover, HoverParams, InitializeParams, Position,
    PublishDiagnosticsClientCapabilities, TextDocumentClientCapabilities,
    TextDocumentIdentifier, TextDocumentPositionParams, Url, WorkspaceFolder,
};
use parking_lot::Mutex;
use protocol_client::{ProtocolClient, methods};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::AnalysisConfig;
use crate::document::DocumentSync;
use crate::errors::{AnalysisError, Result};
use crate::hover::{class_name_from_hover, hover_markdown};

pub const MEASURE_VALUE_COMMAND: &str = "typeprof.measureValue";
const WORKSPACE_NAME: &str = "workspace";

pub struct ServerSession {
    client: Arc<ProtocolClient>,
    root_uri: Url,
    document: Mutex<DocumentSync>,
    sync_gate: tokio::sync::Mutex<()>,
    measured_values: DashMap<u32, String>,
}

impl ServerSession {
    pub fn new(client: Arc<ProtocolClient>, config: &AnalysisConfig) -> Result<Self> {
        let document_uri = parse_uri(&config.document_uri)?;
        let root_uri = parse_uri(&config.root_uri)?;

        Ok(Self {
            client,
            root_uri,
            document: Mutex::new(DocumentSync::new(document_uri, config.language_id.clone())),
            sync_gate: tokio::sync::Mutex::new(()),
            measured_values: DashMap::new(),
        })
    }

    pub fn client(&self) -> &Arc<ProtocolClient> {
        &self.client
    }

    /// `initialize` handshake followed by `initialized`. Returns the server
    /// capabilities payload.
    pub async fn initialize(&self) -> Result<Value> {
        let params = InitializeParams {
            process_id: None,
            root_uri: Some(self.root_uri.clone()),
            capabilities: ClientCapabilities {
                text_document: Some(TextDocumentClientCapabilities {
                    publish_diagnostics: Some(PublishDiagnosticsClientCapabilities::default()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: self.root_uri.clone(),
                name: WORKSPACE_NAME.to_string(),
            }]),
            ..Default::default()
        };

        let result = self.client.send_request(methods::INITIALIZE, params).await?;
        self.client
            .send_notification(methods::INITIALIZED, json!({}))
            .await?;
        Ok(result)
    }

    pub async fn open_document(&self, text: &str) -> Result<()> {
        let _gate = self.sync_gate.lock().await;
        let params = self.document.lock().open(text);
        self.client
            .send_notification(methods::DID_OPEN, params)
            .await?;
        Ok(())
    }

    /// Records the live editor text. Measured values describe the previous
    /// text and are dropped.
    pub fn update_document(&self, text: &str) {
        self.document.lock().update(text);
        self.measured_values.clear();
    }

    pub async fn flush_document(&self) -> Result<()> {
        let _gate = self.sync_gate.lock().await;
        self.flush_locked().await
    }

    async fn flush_locked(&self) -> Result<()> {
        let params = self.document.lock().take_flush();
        if let Some(params) = params {
            trace!("Syncing document version {}", params.text_document.version);
            self.client
                .send_notification(methods::DID_CHANGE, params)
                .await?;
        }
        Ok(())
    }

    /// Class name at a 1-based position of the live document.
    pub async fn type_at_position(&self, line: u32, col: u32) -> Result<Option<String>> {
        let _gate = self.sync_gate.lock().await;
        self.flush_locked().await?;
        self.hover_type(line, col).await
    }

    /// Replaces the server's copy of the document with `content`, tries the
    /// columns in order, then restores the live text. The restore is sent
    /// whether or not the hovers failed; if this future is dropped midway the
    /// document stays marked stale and the next flush restores it.
    pub async fn probe_with_temporary_content(
        &self,
        content: &str,
        line: u32,
        columns: &[u32],
    ) -> Result<Option<String>> {
        let _gate = self.sync_gate.lock().await;

        let params = self.document.lock().temporary_change(content);
        self.client
            .send_notification(methods::DID_CHANGE, params)
            .await?;

        let outcome = self.first_type_at(line, columns).await;
        let restored = self.flush_locked().await;

        let type_name = outcome?;
        restored?;
        Ok(type_name)
    }

    async fn first_type_at(&self, line: u32, columns: &[u32]) -> Result<Option<String>> {
        for &col in columns {
            if let Some(type_name) = self.hover_type(line, col).await? {
                return Ok(Some(type_name));
            }
        }
        Ok(None)
    }

    async fn hover_type(&self, line: u32, col: u32) -> Result<Option<String>> {
        let uri = self.document.lock().uri().clone();
        let params = HoverParams {
            text_document_position_params: TextDocumentPositionParams {
                text_document: TextDocumentIdentifier { uri },
                position: to_wire_position(line, col),
            },
            work_done_progress_params: Default::default(),
        };

        let value = self.client.send_request(methods::HOVER, params).await?;
        if value.is_null() {
            trace!("No hover at {}:{}", line, col);
            return Ok(None);
        }

        let hover: Hover = serde_json::from_value(value)?;
        Ok(class_name_from_hover(&hover_markdown(&hover)))
    }

    /// Asks the server to evaluate `expression` at a 1-based position. The
    /// result is cached per line until the next document change.
    pub async fn measure_value(
        &self,
        expression: &str,
        line: u32,
        col: u32,
    ) -> Result<Option<String>> {
        let _gate = self.sync_gate.lock().await;
        self.flush_locked().await?;

        let position = to_wire_position(line, col);
        let code = self.document.lock().text().to_string();
        let params = ExecuteCommandParams {
            command: MEASURE_VALUE_COMMAND.to_string(),
            arguments: vec![json!({
                "expression": expression,
                "line": position.line,
                "character": position.character,
                "code": code,
            })],
            work_done_progress_params: Default::default(),
        };

        let value = match self
            .client
            .send_request(methods::EXECUTE_COMMAND, params)
            .await?
        {
            Value::Null => None,
            Value::String(value) => Some(value),
            other => Some(other.to_string()),
        };

        if let Some(value) = &value {
            debug!("Measured {} on line {}: {}", expression, line, value);
            self.measured_values.insert(line, value.clone());
        }
        Ok(value)
    }

    pub fn measured_value(&self, line: u32) -> Option<String> {
        self.measured_values.get(&line).map(|value| value.clone())
    }

    /// 1-based line of the live document.
    pub fn line_content(&self, line: u32) -> Option<String> {
        self.document.lock().line_content(line).map(str::to_string)
    }

    pub fn document_text(&self) -> String {
        self.document.lock().text().to_string()
    }

    pub fn document_version(&self) -> i32 {
        self.document.lock().version()
    }
}

fn parse_uri(uri: &str) -> Result<Url> {
    Url::parse(uri).map_err(|e| AnalysisError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

fn to_wire_position(line: u32, col: u32) -> Position {
    Position {
        line: line.saturating_sub(1),
        character: col.saturating_sub(1),
    }
}
