//! JSON-RPC envelope and the typed notification table keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names the engine sends to the analysis server.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const HOVER: &str = "textDocument/hover";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const EXECUTE_COMMAND: &str = "workspace/executeCommand";
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const SYNTAX_CHECK: &str = "rubpad/syntaxCheck";
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Wire envelope: `{ id?, method?, params?, result?, error? }`.
///
/// `id` without `method` is a response; `method` marks a request or a
/// notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Envelope {
    pub fn request(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(Value::from(id)),
            method: Some(method.to_string()),
            params: Some(params),
            ..Default::default()
        }
    }

    pub fn notification(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: Some(method.to_string()),
            params: Some(params),
            ..Default::default()
        }
    }

    pub fn response(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(id),
            result: Some(result),
            ..Default::default()
        }
    }

    pub fn error_response(id: Value, error: ResponseError) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(id),
            error: Some(error),
            ..Default::default()
        }
    }

    /// Numeric id of a response, if this envelope is one.
    pub fn response_id(&self) -> Option<u64> {
        if self.method.is_some() {
            return None;
        }
        self.id.as_ref().and_then(Value::as_u64)
    }
}

/// Server-initiated methods the engine knows about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationMethod {
    PublishDiagnostics,
    SyntaxCheck,
    Other(String),
}

impl NotificationMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PublishDiagnostics => methods::PUBLISH_DIAGNOSTICS,
            Self::SyntaxCheck => methods::SYNTAX_CHECK,
            Self::Other(method) => method,
        }
    }
}

impl From<&str> for NotificationMethod {
    fn from(method: &str) -> Self {
        match method {
            methods::PUBLISH_DIAGNOSTICS => Self::PublishDiagnostics,
            methods::SYNTAX_CHECK => Self::SyntaxCheck,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Key of the notification subscriber table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    Method(NotificationMethod),
    /// Invoked for every notification, after the method-specific handlers.
    Wildcard,
}

impl From<NotificationMethod> for Subscription {
    fn from(method: NotificationMethod) -> Self {
        Self::Method(method)
    }
}

/// A message that did not answer any pending request.
#[derive(Debug, Clone)]
pub struct Notification {
    /// `None` for stray responses whose caller already went away.
    pub method: Option<NotificationMethod>,
    pub params: Value,
    pub id: Option<Value>,
}

impl From<Envelope> for Notification {
    fn from(envelope: Envelope) -> Self {
        Self {
            method: envelope.method.as_deref().map(NotificationMethod::from),
            params: envelope.params.or(envelope.result).unwrap_or(Value::Null),
            id: envelope.id,
        }
    }
}
