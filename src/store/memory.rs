//! In-memory reference implementation of the document store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::{DocumentStore, StoreError, Version};

/// HashMap-backed store with monotonically incrementing versions. Documents
/// are cloned on the way in and out so callers never share references with
/// the stored copy.
pub struct InMemoryStore<D> {
    inner: Mutex<HashMap<String, (D, u64)>>,
}

impl<D> InMemoryStore<D> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<D> Default for InMemoryStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> InMemoryStore<D> {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, (D, u64)>>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".into()))
    }
}

#[async_trait]
impl<D> DocumentStore<D> for InMemoryStore<D>
where
    D: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<(D, Version), StoreError> {
        let map = self.lock()?;
        map.get(id)
            .map(|(doc, v)| (doc.clone(), Version(*v)))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn put(
        &self,
        id: &str,
        doc: D,
        expected: Option<Version>,
    ) -> Result<Version, StoreError> {
        let mut map = self.lock()?;
        let stored = map.get(id).map(|(_, v)| *v);
        let next = match (expected, stored) {
            (None, None) => 1,
            (None, Some(_)) => {
                return Err(StoreError::VersionConflict { id: id.to_string() });
            }
            (Some(_), None) => return Err(StoreError::NotFound(id.to_string())),
            (Some(Version(want)), Some(have)) if want == have => have + 1,
            (Some(_), Some(_)) => {
                debug!(id, "conditional write lost the race");
                return Err(StoreError::VersionConflict { id: id.to_string() });
            }
        };
        map.insert(id.to_string(), (doc, next));
        Ok(Version(next))
    }

    async fn delete(&self, id: &str, expected: Version) -> Result<(), StoreError> {
        let mut map = self.lock()?;
        match map.get(id) {
            None => Err(StoreError::NotFound(id.to_string())),
            Some((_, v)) if *v != expected.0 => {
                Err(StoreError::VersionConflict { id: id.to_string() })
            }
            Some(_) => {
                map.remove(id);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_read_back() {
        let store = InMemoryStore::<String>::new();
        let v = store.put("k", "one".into(), None).await.unwrap();
        assert_eq!(v, Version::initial());
        let (doc, version) = store.get("k").await.unwrap();
        assert_eq!(doc, "one");
        assert_eq!(version, v);
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let store = InMemoryStore::<String>::new();
        store.put("k", "one".into(), None).await.unwrap();
        assert_eq!(
            store.put("k", "two".into(), None).await.unwrap_err(),
            StoreError::VersionConflict { id: "k".into() }
        );
    }

    #[tokio::test]
    async fn stale_write_conflicts_and_fresh_write_wins() {
        let store = InMemoryStore::<String>::new();
        let v1 = store.put("k", "one".into(), None).await.unwrap();
        let v2 = store.put("k", "two".into(), Some(v1)).await.unwrap();
        assert_ne!(v1, v2);

        // A second writer still holding v1 loses.
        assert_eq!(
            store.put("k", "three".into(), Some(v1)).await.unwrap_err(),
            StoreError::VersionConflict { id: "k".into() }
        );
        let (doc, _) = store.get("k").await.unwrap();
        assert_eq!(doc, "two");
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryStore::<String>::new();
        assert_eq!(
            store
                .put("k", "one".into(), Some(Version(1)))
                .await
                .unwrap_err(),
            StoreError::NotFound("k".into())
        );
    }

    #[tokio::test]
    async fn delete_honours_expected_version() {
        let store = InMemoryStore::<String>::new();
        let v1 = store.put("k", "one".into(), None).await.unwrap();
        let v2 = store.put("k", "two".into(), Some(v1)).await.unwrap();

        assert_eq!(
            store.delete("k", v1).await.unwrap_err(),
            StoreError::VersionConflict { id: "k".into() }
        );
        store.delete("k", v2).await.unwrap();
        assert!(matches!(
            store.get("k").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }
}
