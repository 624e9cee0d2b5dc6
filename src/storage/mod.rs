//! Object storage abstraction for badge objects

pub mod gcs;
pub mod memory;

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// A (bucket, object name) pair identifying a storage object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.name)
    }
}

/// Metadata applied to or read from a storage object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMeta {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Storage primitives needed to publish a badge, injected into the
/// publisher so decision logic is testable against a fake backend.
/// `project_id` selects the storage account context for the call.
#[async_trait]
pub trait BadgeStorage: Send + Sync {
    /// Fetches object metadata; an absent object yields `Ok(None)`.
    async fn get(&self, object: &ObjectRef, project_id: &str) -> Result<Option<ObjectMeta>>;

    /// Copies `source` over `target` in a single backend call, applying
    /// `meta` to the target.
    async fn copy(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        meta: &ObjectMeta,
        project_id: &str,
    ) -> Result<()>;

    /// Grants read access on `object` to the universal allUsers principal.
    async fn grant_public_read(&self, object: &ObjectRef, project_id: &str) -> Result<()>;
}
