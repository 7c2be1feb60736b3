//! Model definitions
//!
//! Data models of a StackFlow declaration, split by concern.

mod network;
mod resource;
mod stack;

// Re-exports
pub use network::*;
pub use resource::*;
pub use stack::*;
