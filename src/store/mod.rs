pub mod object;
pub mod table;

use anyhow::Result;
use async_trait::async_trait;

use crate::record::UserRow;

/// Path-addressed object store with overwrite-on-conflict uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `bytes` to `path`, replacing any existing object, and return
    /// the publicly resolvable URL for it.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}

/// Table of users with insert-or-update semantics keyed by `id`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert(&self, row: &UserRow) -> Result<()>;
}
