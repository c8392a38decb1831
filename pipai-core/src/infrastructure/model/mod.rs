//! Model infrastructure module
//!
//! # Structure
//! - `types` - Completion error type
//! - `traits` - `CompletionProvider` trait
//! - `clients` - HTTP client implementations

pub mod clients;
pub mod traits;
pub mod types;

pub use clients::OpenAiCompatibleClient;
pub use traits::CompletionProvider;
pub use types::CompletionError;
