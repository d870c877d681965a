//! # Protocol Client
//!
//! JSON-RPC plumbing between the analysis engine and an out-of-process
//! language-analysis server.
//!
//! ```text
//! ┌──────────────────┐  outbound (String)  ┌──────────────────┐
//! │  ProtocolClient  │────────────────────▶│                  │
//! │  • pending table │                     │  Analysis server │
//! │  • handlers      │◀────────────────────│                  │
//! └──────────────────┘  inbound (String)   └──────────────────┘
//! ```
//!
//! Responses are correlated by id and may arrive in any order. Everything
//! else coming back from the server is a notification, dispatched through a
//! table keyed by [`Subscription`].

pub mod client;
pub mod errors;
pub mod message;
pub mod transport;

pub use client::ProtocolClient;
pub use errors::{ProtocolError, Result};
pub use message::{
    Envelope, Notification, NotificationMethod, ResponseError, Subscription, methods,
};
pub use transport::{ServerEnd, Transport};
