//! Formatter implementations

pub mod json;
pub mod plain;

pub use json::Json;
pub use plain::Plain;

// Re-export the trait for convenience
pub use crate::core::Formatter;
