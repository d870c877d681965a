use protocol_client::message::methods;
use protocol_client::{Envelope, ResponseError, ServerEnd, Transport};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

const INTERNAL_ERROR: i64 = -32603;

/// How the mock answers one hover request.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverReply {
    Markdown(String),
    Null,
    Error(String),
    /// Never answers, so the client's request times out.
    Silent,
}

impl HoverReply {
    pub fn markdown(value: &str) -> Self {
        Self::Markdown(value.to_string())
    }
}

/// A hover request as the server saw it: 0-based wire position and the
/// document text it held at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverQuery {
    pub line: u32,
    pub character: u32,
    pub document: String,
}

type HoverScript = Box<dyn FnMut(&HoverQuery) -> HoverReply + Send>;

#[derive(Default)]
struct MockState {
    document: Option<String>,
    version: Option<i64>,
    methods: Vec<String>,
    hover_queries: Vec<HoverQuery>,
    commands: Vec<Value>,
    measure_result: Value,
}

/// In-process stand-in for the type server.
///
/// Keeps its own copy of the synchronised document, answers `initialize`,
/// `textDocument/hover` (through a script) and `workspace/executeCommand`,
/// and records everything it receives.
pub struct MockLanguageServer {
    state: Arc<Mutex<MockState>>,
    outgoing: mpsc::Sender<String>,
    task: JoinHandle<()>,
}

impl MockLanguageServer {
    /// Mock whose hovers never find anything.
    pub fn connect_default() -> (Transport, Self) {
        Self::connect(|_| HoverReply::Null)
    }

    pub fn connect<F>(hover: F) -> (Transport, Self)
    where
        F: FnMut(&HoverQuery) -> HoverReply + Send + 'static,
    {
        let (transport, server_end) = Transport::in_memory();
        (transport, Self::start(server_end, Box::new(hover)))
    }

    fn start(server_end: ServerEnd, hover: HoverScript) -> Self {
        let ServerEnd { incoming, outgoing } = server_end;
        let state = Arc::new(Mutex::new(MockState::default()));
        let task = tokio::spawn(serve(
            incoming,
            outgoing.clone(),
            Arc::clone(&state),
            hover,
        ));
        Self {
            state,
            outgoing,
            task,
        }
    }

    /// The document as the server currently holds it.
    pub fn document(&self) -> Option<String> {
        self.state.lock().unwrap().document.clone()
    }

    pub fn document_version(&self) -> Option<i64> {
        self.state.lock().unwrap().version
    }

    /// Every method received, requests and notifications, in order.
    pub fn methods(&self) -> Vec<String> {
        self.state.lock().unwrap().methods.clone()
    }

    pub fn method_count(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .methods
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }

    pub fn hover_queries(&self) -> Vec<HoverQuery> {
        self.state.lock().unwrap().hover_queries.clone()
    }

    /// Arguments of every `workspace/executeCommand` request.
    pub fn commands(&self) -> Vec<Value> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn set_measure_result(&self, result: Value) {
        self.state.lock().unwrap().measure_result = result;
    }

    pub async fn notify(&self, method: &str, params: Value) {
        let envelope = Envelope::notification(method, params);
        self.send_raw(&serde_json::to_string(&envelope).unwrap())
            .await;
    }

    pub async fn send_raw(&self, raw: &str) {
        self.outgoing.send(raw.to_string()).await.unwrap();
    }

    /// Stops serving and closes the channel towards the client.
    pub fn disconnect(self) {
        self.task.abort();
    }
}

impl Drop for MockLanguageServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    mut incoming: mpsc::Receiver<String>,
    outgoing: mpsc::Sender<String>,
    state: Arc<Mutex<MockState>>,
    mut hover: HoverScript,
) {
    while let Some(raw) = incoming.recv().await {
        let envelope: Envelope = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Mock server received malformed message: {}", e);
                continue;
            }
        };
        let Some(method) = envelope.method.clone() else {
            continue;
        };
        let params = envelope.params.clone().unwrap_or(Value::Null);
        state.lock().unwrap().methods.push(method.clone());

        let Some(id) = envelope.id else {
            observe_notification(&method, &params, &state);
            continue;
        };

        let reply = match method.as_str() {
            methods::INITIALIZE => Some(Envelope::response(
                id,
                json!({"capabilities": {"hoverProvider": true, "textDocumentSync": 1}}),
            )),
            methods::HOVER => {
                let query = HoverQuery {
                    line: position_field(&params, "line"),
                    character: position_field(&params, "character"),
                    document: state.lock().unwrap().document.clone().unwrap_or_default(),
                };
                state.lock().unwrap().hover_queries.push(query.clone());
                hover_envelope(id, hover(&query))
            }
            methods::EXECUTE_COMMAND => {
                let mut state = state.lock().unwrap();
                state.commands.push(params);
                Some(Envelope::response(id, state.measure_result.clone()))
            }
            _ => Some(Envelope::response(id, Value::Null)),
        };

        if let Some(reply) = reply {
            if outgoing
                .send(serde_json::to_string(&reply).unwrap())
                .await
                .is_err()
            {
                break;
            }
        }
    }
}

fn observe_notification(method: &str, params: &Value, state: &Mutex<MockState>) {
    let text = match method {
        methods::DID_OPEN => params["textDocument"]["text"].as_str(),
        methods::DID_CHANGE => params["contentChanges"]
            .as_array()
            .and_then(|changes| changes.last())
            .and_then(|change| change["text"].as_str()),
        _ => return,
    };

    let mut state = state.lock().unwrap();
    if let Some(text) = text {
        state.document = Some(text.to_string());
    }
    state.version = params["textDocument"]["version"].as_i64();
}

fn position_field(params: &Value, field: &str) -> u32 {
    params["position"][field].as_u64().unwrap_or_default() as u32
}

fn hover_envelope(id: Value, reply: HoverReply) -> Option<Envelope> {
    match reply {
        HoverReply::Markdown(value) => Some(Envelope::response(
            id,
            json!({"contents": {"kind": "markdown", "value": value}}),
        )),
        HoverReply::Null => Some(Envelope::response(id, Value::Null)),
        HoverReply::Error(message) => Some(Envelope::error_response(
            id,
            ResponseError {
                code: INTERNAL_ERROR,
                message,
                data: None,
            },
        )),
        HoverReply::Silent => None,
    }
}
