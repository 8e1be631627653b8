//! Command handlers for CLI operations
//!
//! This module contains handlers for different CLI commands,
//! separating command execution logic from parsing and validation.

pub mod dlq;
pub mod enqueue;
pub mod work;

pub use dlq::DlqCommandHandler;
pub use enqueue::EnqueueCommandHandler;
pub use work::WorkCommandHandler;
