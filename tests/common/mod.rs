//! Common test utilities and helpers
//!
//! - Spawning backend nodes on ephemeral ports over shared in-memory services
//! - WebSocket client helpers
//! - Polling assertions for asynchronous effects
//! - Store wrappers for fault injection

#![allow(dead_code)]

pub mod assertions;
pub mod node;
pub mod store;
pub mod ws_client;

pub use assertions::*;
pub use node::*;
pub use store::*;
pub use ws_client::*;
