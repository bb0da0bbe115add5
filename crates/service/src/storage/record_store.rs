use async_trait::async_trait;
use models::RecordId;
use tracing::debug;

use crate::errors::ServiceError;
use crate::storage::flat_file::FlatFile;

/// Converts between the text of a backing file and its records.
#[async_trait]
pub trait RecordCodec: Send + Sync {
    type Record: Clone + Send + Sync + 'static;

    fn id_of(record: &Self::Record) -> RecordId;

    async fn decode(&self, text: &str) -> Result<Vec<Self::Record>, ServiceError>;

    async fn encode(&self, records: &[Self::Record]) -> Result<String, ServiceError>;
}

/// Generic flat-file record store.
///
/// Every operation loads the complete file and scans it linearly; every
/// mutation rewrites the complete file. Mutations are serialized through the
/// file's writer lock.
pub struct RecordStore<C> {
    file: FlatFile,
    codec: C,
    entity: &'static str,
}

impl<C: RecordCodec> RecordStore<C> {
    pub fn new(file: FlatFile, codec: C, entity: &'static str) -> Self {
        Self { file, codec, entity }
    }

    pub fn file(&self) -> &FlatFile {
        &self.file
    }

    /// Load all records without taking the writer lock.
    pub async fn snapshot(&self) -> Result<Vec<C::Record>, ServiceError> {
        let text = self.file.read_text().await?;
        self.codec.decode(&text).await
    }

    /// Overwrite the file with `records` without taking the writer lock.
    ///
    /// Pairing this with [`RecordStore::snapshot`] outside of
    /// [`RecordStore::mutate`] is a plain read-modify-write and can lose
    /// concurrent updates.
    pub async fn persist(&self, records: &[C::Record]) -> Result<(), ServiceError> {
        let text = self.codec.encode(records).await?;
        self.file.write(&text).await?;
        debug!(entity = self.entity, path = %self.file.path().display(), records = records.len(), "file rewritten");
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<C::Record>, ServiceError> {
        self.snapshot().await
    }

    pub async fn find_by_id(&self, id: RecordId) -> Result<Option<C::Record>, ServiceError> {
        Ok(self.snapshot().await?.into_iter().find(|r| C::id_of(r) == id))
    }

    pub async fn filter_by<F>(&self, pred: F) -> Result<Vec<C::Record>, ServiceError>
    where
        F: Fn(&C::Record) -> bool + Send,
    {
        Ok(self.snapshot().await?.into_iter().filter(|r| pred(r)).collect())
    }

    /// Locked load-modify-save. If `f` fails, nothing is written.
    pub async fn mutate<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Vec<C::Record>) -> Result<T, ServiceError> + Send,
        T: Send,
    {
        let _guard = self.file.lock().await;
        let mut records = self.snapshot().await?;
        let out = f(&mut records)?;
        self.persist(&records).await?;
        Ok(out)
    }

    /// Append a record. No uniqueness check on the id.
    pub async fn insert(&self, record: C::Record) -> Result<(), ServiceError> {
        self.mutate(|records| {
            records.push(record);
            Ok(())
        })
        .await
    }

    /// Apply `f` to a copy of the record with `id` and store it back.
    pub async fn update<F>(&self, id: RecordId, f: F) -> Result<C::Record, ServiceError>
    where
        F: FnOnce(&mut C::Record) -> Result<(), ServiceError> + Send,
    {
        let entity = self.entity;
        self.mutate(move |records| {
            let idx = position::<C>(records, id).ok_or_else(|| ServiceError::not_found(entity))?;
            let mut next = records[idx].clone();
            f(&mut next)?;
            records[idx] = next.clone();
            Ok(next)
        })
        .await
    }

    /// Remove and return the record with `id`.
    pub async fn remove(&self, id: RecordId) -> Result<C::Record, ServiceError> {
        let entity = self.entity;
        self.mutate(move |records| {
            let idx = position::<C>(records, id).ok_or_else(|| ServiceError::not_found(entity))?;
            Ok(records.remove(idx))
        })
        .await
    }
}

fn position<C: RecordCodec>(records: &[C::Record], id: RecordId) -> Option<usize> {
    records.iter().position(|r| C::id_of(r) == id)
}
