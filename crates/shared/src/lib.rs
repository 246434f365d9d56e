//! Shared types for the live-chat widget: error taxonomy and classification,
//! realtime wire protocol, and data models.

pub mod classify;
pub mod error;
pub mod models;
pub mod protocol;
pub mod taxonomy;

pub use classify::*;
pub use error::*;
pub use models::*;
pub use protocol::*;
pub use taxonomy::*;
