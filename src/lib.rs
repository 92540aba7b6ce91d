//! chatrelay - Main Library
//!
//! Real-time delivery core of a multi-node chat backend. Clients hold a
//! WebSocket to any backend process; the processes share a session directory
//! and identity leases in redis, so two users connected to different
//! processes still exchange messages in real time.
//!
//! # Module Structure
//!
//! - **`shared`** - wire types, configuration and shared errors
//! - **`backend`** - the Axum server, sessions, routing and persistence
//!
//! # Usage
//!
//! ```rust,no_run
//! use chatrelay::backend::server::create_app;
//! use chatrelay::shared::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app(AppConfig::load()?).await?;
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:7999").await?;
//! axum::serve(listener, app.routes.clone()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery Guarantees
//!
//! Messages are persisted before they are routed and routing is at-most-once.
//! A recipient that is offline (or whose backend cannot be reached) can read
//! the message later through the history endpoint.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;
