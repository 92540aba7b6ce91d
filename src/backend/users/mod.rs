//! User Management
//!
//! Registration and lookup of chat users. Accounts carry no credentials;
//! connecting clients are identified by id only.

/// HTTP handlers for `/user`
pub mod handlers;

pub use handlers::{handle_create_user, handle_get_user};
