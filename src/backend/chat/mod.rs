//! Chat Backend Module
//!
//! Server-side chat functionality: the per-connection WebSocket session and
//! the HTTP handlers that create sessions, accept redirected messages and
//! serve history.
//!
//! # Architecture
//!
//! - **`session`** - connection lifecycle, read and write loops
//! - **`handlers`** - `GET /ws`, `POST /internal/redirect`, `GET /messages`
//!
//! # Message Flow
//!
//! ```text
//! client ──frame──▶ read loop ──persist──▶ repository
//!                      │
//!                      ├──dispatch──▶ router ──▶ local channel / peer backend
//!                      └──ack──▶ client
//! ```

/// WebSocket session lifecycle
pub mod session;

/// Chat HTTP handlers
pub mod handlers;

/// Re-export commonly used types
pub use handlers::{handle_list_messages, handle_redirect, handle_ws_upgrade};
pub use session::{Session, SessionState};
