use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, Result};
use folio_core::{FolioError, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

/// Records addressable by a string id.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A collection stored as one JSON array document in the key/value store.
///
/// Every read-modify-write runs under `write_lock`, so concurrent inserts
/// into the same collection never drop each other's records.
pub struct DocumentCollection<T> {
    kv: Arc<dyn KeyValueStore>,
    key: &'static str,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> DocumentCollection<T>
where
    T: Identified + Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(kv: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            kv,
            key,
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    async fn load(&self) -> Result<Vec<T>> {
        let Some(doc) = self.kv.read(self.key).await? else {
            return Ok(Vec::new());
        };
        match doc {
            Value::Array(_) => serde_json::from_value(doc)
                .with_context(|| format!("document '{}' has unexpected records", self.key)),
            Value::Null => Ok(Vec::new()),
            _ => Err(FolioError::general_error(format!(
                "document '{}' is not a list",
                self.key
            ))
            .into_anyhow()),
        }
    }

    async fn save(&self, records: &[T]) -> Result<()> {
        let value = serde_json::to_value(records)?;
        self.kv.write(self.key, value).await
    }

    pub async fn find(&self) -> Result<Vec<T>> {
        self.load().await
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.load().await?.into_iter().find(|r| r.id() == id))
    }

    pub async fn insert(&self, record: T) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        records.push(record.clone());
        self.save(&records).await?;
        Ok(record)
    }

    /// Insert or replace many records with a single write.
    ///
    /// `merge` sees the stored record with the same id, if any, and returns
    /// the record to keep.
    pub async fn upsert_many<F>(&self, incoming: Vec<T>, merge: F) -> Result<Vec<T>>
    where
        F: Fn(Option<&T>, T) -> T,
    {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let mut saved = Vec::with_capacity(incoming.len());

        for record in incoming {
            match records.iter().position(|r| r.id() == record.id()) {
                Some(idx) => {
                    let merged = merge(Some(&records[idx]), record);
                    records[idx] = merged.clone();
                    saved.push(merged);
                }
                None => {
                    let merged = merge(None, record);
                    records.push(merged.clone());
                    saved.push(merged);
                }
            }
        }

        self.save(&records).await?;
        Ok(saved)
    }

    /// Remove by id; `None` when nothing matched (and nothing was written).
    pub async fn remove(&self, id: &str) -> Result<Option<T>> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let Some(idx) = records.iter().position(|r| r.id() == id) else {
            return Ok(None);
        };
        let removed = records.remove(idx);
        self.save(&records).await?;
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::MemoryKeyValueStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        text: String,
    }

    impl Identified for Note {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn note(id: &str, text: &str) -> Note {
        Note {
            id: id.into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let notes = DocumentCollection::<Note>::new(Arc::new(MemoryKeyValueStore::new()), "notes");
        assert!(notes.find().await.unwrap().is_empty());

        notes.insert(note("a", "one")).await.unwrap();
        notes.insert(note("b", "two")).await.unwrap();
        assert_eq!(notes.get("b").await.unwrap(), Some(note("b", "two")));

        assert_eq!(notes.remove("a").await.unwrap(), Some(note("a", "one")));
        assert_eq!(notes.remove("a").await.unwrap(), None);
        assert_eq!(notes.find().await.unwrap(), vec![note("b", "two")]);
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let notes = DocumentCollection::<Note>::new(Arc::new(MemoryKeyValueStore::new()), "notes");
        notes.insert(note("a", "old")).await.unwrap();

        let saved = notes
            .upsert_many(vec![note("a", "new"), note("c", "three")], |existing, mut n| {
                if let Some(prev) = existing {
                    n.text = format!("{}->{}", prev.text, n.text);
                }
                n
            })
            .await
            .unwrap();

        assert_eq!(saved[0].text, "old->new");
        assert_eq!(notes.find().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_inserts_are_serialized() {
        let notes = Arc::new(DocumentCollection::<Note>::new(
            Arc::new(MemoryKeyValueStore::new()),
            "notes",
        ));
        let mut handles = Vec::new();
        for i in 0..20 {
            let notes = Arc::clone(&notes);
            handles.push(tokio::spawn(async move {
                notes.insert(note(&i.to_string(), "x")).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(notes.find().await.unwrap().len(), 20);
    }
}
