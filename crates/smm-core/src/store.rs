use async_trait::async_trait;

use crate::{domain::Post, Result};

/// Durable append-only log of submitted posts.
///
/// Implementations serialize `submit` calls internally (each gets a unique,
/// increasing id) and `latest` only ever observes fully committed inserts.
/// Callers share one handle and add no locking of their own.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Append a post. The store assigns `id` and `created_at`.
    async fn submit(&self, language: &str, content: &str) -> Result<Post>;

    /// Newest post for `language` (by `created_at`, then `id`), if any.
    async fn latest(&self, language: &str) -> Result<Option<Post>>;

    /// Number of stored posts across all languages.
    async fn count(&self) -> Result<u64>;
}
