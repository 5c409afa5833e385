//! Cyclecast - scheduled posting from a fixed content pool
//!
//! This library provides the pieces of a single posting run: picking the
//! next unposted item from a shuffled cycle, rotating OAuth2 tokens, and
//! publishing single posts or reply-chained threads.

pub mod config;
pub mod error;
pub mod logging;
pub mod oauth;
pub mod platforms;
pub mod publisher;
pub mod runner;
pub mod selector;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{ClientCredentials, Config, ThreadPolicy};
pub use error::{CyclecastError, Result};
pub use publisher::Publisher;
pub use runner::{RunReport, RunStage, Runner};
pub use selector::Selector;
pub use store::{DocumentStore, FileStore, MemoryStore};
pub use types::{ContentBody, ContentItem, ContentKind, Credentials, PostingState};
