//! In-memory storage backend for tests and local runs

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{BadgeStorage, ObjectMeta, ObjectRef};
use crate::error::{BadgeError, Result};

/// A stored object is just its metadata plus its visibility flag; badge
/// publishing never reads object content.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub meta: ObjectMeta,
    pub public_read: bool,
}

/// Fake backend keyed by (bucket, object name). Records how often it was
/// called and can inject a grant failure, so tests can assert on backend
/// interactions, not just final state.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    objects: Arc<Mutex<HashMap<(String, String), StoredObject>>>,
    calls: Arc<Mutex<usize>>,
    fail_next_grant: Arc<Mutex<bool>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an object; freshly inserted objects are not public.
    pub fn insert(&self, object: &ObjectRef, meta: ObjectMeta) {
        self.objects.lock().unwrap().insert(
            key(object),
            StoredObject {
                meta,
                public_read: false,
            },
        );
    }

    pub fn stored(&self, object: &ObjectRef) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(&key(object)).cloned()
    }

    /// Number of trait calls made against this backend.
    pub fn backend_calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Makes the next `grant_public_read` call fail.
    pub fn fail_next_grant(&self) {
        *self.fail_next_grant.lock().unwrap() = true;
    }

    fn record_call(&self) {
        *self.calls.lock().unwrap() += 1;
    }
}

fn key(object: &ObjectRef) -> (String, String) {
    (object.bucket.clone(), object.name.clone())
}

#[async_trait]
impl BadgeStorage for MemoryStorage {
    async fn get(&self, object: &ObjectRef, _project_id: &str) -> Result<Option<ObjectMeta>> {
        self.record_call();
        let objects = self.objects.lock().unwrap();
        Ok(objects.get(&key(object)).map(|stored| stored.meta.clone()))
    }

    async fn copy(
        &self,
        source: &ObjectRef,
        target: &ObjectRef,
        meta: &ObjectMeta,
        _project_id: &str,
    ) -> Result<()> {
        self.record_call();
        let mut objects = self.objects.lock().unwrap();
        if !objects.contains_key(&key(source)) {
            return Err(BadgeError::Storage(format!(
                "copy source '{}' does not exist",
                source
            )));
        }
        // A copy produces a fresh object; default ACLs apply until the
        // public grant is repeated.
        objects.insert(
            key(target),
            StoredObject {
                meta: meta.clone(),
                public_read: false,
            },
        );
        Ok(())
    }

    async fn grant_public_read(&self, object: &ObjectRef, _project_id: &str) -> Result<()> {
        self.record_call();
        {
            let mut fail = self.fail_next_grant.lock().unwrap();
            if *fail {
                *fail = false;
                return Err(BadgeError::Storage(format!(
                    "public read grant on '{}' was refused",
                    object
                )));
            }
        }
        let mut objects = self.objects.lock().unwrap();
        match objects.get_mut(&key(object)) {
            Some(stored) => {
                stored.public_read = true;
                Ok(())
            }
            None => Err(BadgeError::Storage(format!(
                "cannot grant public read, object '{}' does not exist",
                object
            ))),
        }
    }
}
