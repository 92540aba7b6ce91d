//! Routes Module
//!
//! HTTP route configuration.
//!
//! # Architecture
//!
//! - **`router`** - assembles every route group and middleware
//! - **`chat_routes`** - WebSocket, redirect and history endpoints
//! - **`api_routes`** - user and health endpoints
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation
//! ├── chat_routes.rs  - Chat route configuration
//! └── api_routes.rs   - API route configuration
//! ```

/// Main router creation
pub mod router;

/// Chat-related route configuration
pub mod chat_routes;

/// API endpoint configuration
pub mod api_routes;

// Re-export commonly used functions
pub use router::create_router;
