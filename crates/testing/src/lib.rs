//! Test doubles shared by the workspace's test suites.

pub mod mock_server;

pub use mock_server::{HoverQuery, HoverReply, MockLanguageServer};
