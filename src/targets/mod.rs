//! Target implementations
//!
//! Thin adapters around the engine's `Target` trait. Each target's `write`
//! runs on its host's single worker thread.

pub mod console;
pub mod file;
pub mod tcp;
pub mod testing;

pub use console::{ConsoleStream, ConsoleTarget};
pub use file::FileTarget;
pub use tcp::TcpTarget;

// Re-export the trait for convenience
pub use crate::core::Target;
