//! Unified-store sink integration.

pub mod client;
pub mod types;

pub use client::{HttpUnifiedStore, UnifiedStore};
pub use types::{StoreError, UnifiedChunk};
