//! Duplex message channels between the client and an analysis server.
//!
//! The client only ever sees two `mpsc` channels of raw JSON strings. Two
//! ways of producing them are provided:
//!
//! - [`Transport::in_memory`] pairs the client with a [`ServerEnd`] living in
//!   the same process (used for tests and embedded servers).
//! - [`Transport::spawn_process`] starts the server as a child process and
//!   bridges its stdio using LSP `Content-Length` framing.

use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::Result;

const CHANNEL_CAPACITY: usize = 1024;
const CONTENT_LENGTH_HEADER: &str = "content-length";

/// Client side of a duplex channel.
pub struct Transport {
    pub(crate) outbound: mpsc::Sender<String>,
    pub(crate) inbound: mpsc::Receiver<String>,
}

/// Server side of an in-memory transport.
pub struct ServerEnd {
    /// Messages written by the client.
    pub incoming: mpsc::Receiver<String>,
    /// Messages delivered to the client.
    pub outgoing: mpsc::Sender<String>,
}

impl Transport {
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Self {
        Self { outbound, inbound }
    }

    pub fn in_memory() -> (Transport, ServerEnd) {
        let (client_tx, server_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (server_tx, client_rx) = mpsc::channel(CHANNEL_CAPACITY);
        (
            Transport::new(client_tx, client_rx),
            ServerEnd {
                incoming: server_rx,
                outgoing: server_tx,
            },
        )
    }

    /// Spawns `program` and speaks framed JSON-RPC over its stdin/stdout.
    ///
    /// The inbound channel closes when the process closes its stdout, which in
    /// turn rejects every request still waiting on the client.
    pub fn spawn_process(program: &str, args: &[String]) -> Result<(Transport, Child)> {
        info!("Spawning analysis server: {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("analysis server stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("analysis server stdout unavailable"))?;

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(body) = outbound_rx.recv().await {
                let frame = encode_frame(&body);
                if let Err(e) = stdin.write_all(frame.as_bytes()).await {
                    error!("Failed to write to analysis server: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    error!("Failed to flush analysis server stdin: {}", e);
                    break;
                }
            }
            debug!("Analysis server writer finished");
        });

        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            loop {
                match read_frame(&mut reader).await {
                    Ok(Some(body)) => {
                        if inbound_tx.send(body).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Analysis server closed its output");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read from analysis server: {}", e);
                        break;
                    }
                }
            }
        });

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "analysis_server", "{}", line);
                }
            });
        }

        Ok((Transport::new(outbound_tx, inbound_rx), child))
    }
}

pub fn encode_frame(body: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", body.len(), body)
}

/// Reads one framed message. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            if content_length.is_some() {
                break;
            }
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH_HEADER) {
                let length = value
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                content_length = Some(length);
            }
        }
    }

    let length = content_length.unwrap_or_default();
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    String::from_utf8(body)
        .map(Some)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
