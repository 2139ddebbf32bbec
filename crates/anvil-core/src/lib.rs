pub mod error;
pub mod logging;
pub mod naming;
pub mod workflow;

// Re-export common error type
pub use error::AnvilError;
