//! Backend Module
//!
//! All server-side code of the chat delivery core: an Axum HTTP/WebSocket
//! server that accepts client connections, tracks which backend process owns
//! each user's connection, and routes messages between processes.
//!
//! # Architecture
//!
//! - **`server`** - initialization, application state, service loading
//! - **`routes`** - route configuration and router assembly
//! - **`chat`** - WebSocket sessions and chat HTTP handlers
//! - **`users`** - user registration and lookup
//! - **`realtime`** - local channel registry, session directory, message router
//! - **`identity`** - unique backend identity lease with renewal
//! - **`store`** - key/value store with expiry (redis or in-memory)
//! - **`repository`** - user and message persistence (Postgres or in-memory)
//! - **`error`** - HTTP-facing error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── chat/           - Sessions and chat handlers
//! ├── users/          - User handlers
//! ├── realtime/       - Registry, directory, router
//! ├── identity/       - Backend identity manager
//! ├── store/          - Key/value stores
//! ├── repository/     - Persistence collaborators
//! └── error/          - Error types
//! ```
//!
//! # Multi-node Delivery
//!
//! Every process acquires a unique identity lease in the shared store whose
//! value is its advertised address. When a user connects, the process records
//! itself as the owner of that user in the session directory. A message for a
//! user connected elsewhere is POSTed to the owner's `/internal/redirect`.

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// WebSocket sessions and chat handlers
pub mod chat;

/// User management
pub mod users;

/// Real-time delivery
pub mod realtime;

/// Backend identity lease
pub mod identity;

/// Key/value stores with expiry
pub mod store;

/// Persistence collaborators
pub mod repository;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::BackendError;
pub use server::{create_app, App, AppState};
