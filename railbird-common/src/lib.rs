//! # Railbird Common Library
//!
//! Shared code for the Railbird extraction services including:
//! - Event types (ExtractEvent enum) and the EventBus
//! - Configuration loading
//! - Generic retry/backoff combinator
//! - Common error types

pub mod config;
pub mod error;
pub mod events;
pub mod retry;

pub use error::{Error, Result};
pub use retry::{BackoffStrategy, RetryPolicy};
