//! In-memory respondent store.

use async_trait::async_trait;
use curio_core::error::Result;
use curio_core::state::RespondentStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Respondent store that lives for the process only.
///
/// Used by tests and by front ends that have no persistent storage scope.
#[derive(Debug, Default)]
pub struct InMemoryRespondentStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemoryRespondentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl RespondentStore for InMemoryRespondentStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = InMemoryRespondentStore::with_entries([("a", "1")]);
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("1"));

        store.set("b", "anon_abc").await.unwrap();
        assert_eq!(store.get("b").await.unwrap().as_deref(), Some("anon_abc"));

        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap().as_deref(), Some("2"));
    }
}
