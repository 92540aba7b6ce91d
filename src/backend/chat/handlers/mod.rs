//! Chat Handlers Module
//!
//! Axum handlers for the chat endpoints.
//!
//! # Architecture
//!
//! - **`upgrade`** - WebSocket upgrade (`GET /ws`)
//! - **`redirect`** - messages forwarded by peer backends (`POST /internal/redirect`)
//! - **`history`** - stored message history (`GET /messages`)
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs       - Module exports and documentation
//! ├── upgrade.rs   - WebSocket upgrade handler
//! ├── redirect.rs  - Inter-backend redirect handler
//! └── history.rs   - Message history handler
//! ```

/// WebSocket upgrade handler
pub mod upgrade;

/// Inter-backend redirect handler
pub mod redirect;

/// Message history handler
pub mod history;

// Re-export handlers for convenience
pub use history::handle_list_messages;
pub use redirect::handle_redirect;
pub use upgrade::handle_ws_upgrade;
