//! Real-time Delivery Module
//!
//! Everything needed to get a message from the sender's session to the
//! recipient's socket, wherever in the cluster that socket lives.
//!
//! # Architecture
//!
//! - **`registry`** - users connected to this process and their outbound queues
//! - **`directory`** - cluster-wide user → owning backend map with expiry
//! - **`router`** - local enqueue or HTTP redirect to the owning backend
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs        - Module exports and documentation
//! ├── registry.rs   - Local channel registry
//! ├── directory.rs  - Distributed session directory
//! └── router.rs     - Message router
//! ```
//!
//! # Delivery Semantics
//!
//! Delivery is at-most-once and fire-and-forget. Messages are persisted
//! before routing, so anything dropped here is still available through the
//! message history endpoint.

/// Local channel registry
pub mod registry;

/// Distributed session directory
pub mod directory;

/// Local-or-redirect message routing
pub mod router;

pub use directory::{session_key, SessionDirectory};
pub use registry::{ChannelError, LocalChannel, LocalChannelReceiver, LocalChannelRegistry};
pub use router::{DeliveryFailure, DeliveryOutcome, MessageRouter};
