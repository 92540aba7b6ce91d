//! Shared Module
//!
//! Types shared by every backend layer: the JSON wire formats spoken to
//! clients and to peer backends, decoding errors, and configuration.

/// Wire types (client frames, acks, redirects)
pub mod message;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use message::{Ack, AckStatus, InboundFrame, MessageRedirect, OutboundPush, UserId};
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
