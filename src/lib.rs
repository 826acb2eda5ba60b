// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod archive;
pub mod config;
pub mod export;
pub mod feed;
pub mod notify;
pub mod pipeline;
pub mod rollup;
pub mod timeutil;

// ---- Re-exports for stable public API ----
pub use crate::archive::{ArchiveStore, MergeOutcome};
pub use crate::config::AppConfig;
pub use crate::feed::types::{FeedSource, Telegram};
pub use crate::notify::WebhookNotifier;
