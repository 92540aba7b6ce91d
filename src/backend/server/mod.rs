//! Server Module
//!
//! Initialization and configuration of the Axum HTTP server.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Loading of optional services (database, key/value store)
//! - **`init`** - Server initialization, app creation and shutdown
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Service loading (Postgres, redis)
//! └── init.rs         - Server initialization and app creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Service Loading**: store and repositories, in memory only when unconfigured
//! 2. **Identity**: unique backend identity lease, renewed in the background
//! 3. **State Creation**: registry, directory, router, task tracker
//! 4. **Router Creation**: all routes and middleware

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use init::{build_app, create_app, App, StartupError};
pub use state::AppState;
