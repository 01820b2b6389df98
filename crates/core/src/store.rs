//! The document store.
//!
//! [`DocumentStore`] owns the authoritative in-memory collection and a [`DocumentStorage`]
//! backend. Every mutation takes the collection lock, applies the change, persists it and only
//! then releases the lock; if persisting fails the in-memory change is undone, so memory and
//! disk never diverge.
//!
//! Reads never fail: an unknown id is simply `None`.

use crate::auth::{AccessGate, Session};
use crate::classifier::classify;
use crate::config::{ContentMode, StorageKind, StoreConfig};
use crate::document::{ContentRef, Document, DocumentPatch, UploadOptions};
use crate::error::{DocumentError, DocumentResult, PersistenceError};
use crate::export::{ContentFetcher, FetchError};
use crate::storage::{Collection, DocumentStorage, RecordStorage, SnapshotStorage};
use chrono::Utc;
use specsheet_files::{
    decode_data_url, encode_data_url, validate, BlobStore, InMemoryFile, PdfCandidate,
    ValidationError, ValidationLimits,
};
use specsheet_types::{NonEmptyText, ProductCategory};
use specsheet_uuid::DocumentId;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const ID_ALLOCATION_ATTEMPTS: usize = 5;

pub struct DocumentStore {
    storage: Box<dyn DocumentStorage>,
    blobs: BlobStore,
    gate: Arc<AccessGate>,
    fetcher: Arc<dyn ContentFetcher>,
    content_mode: ContentMode,
    limits: ValidationLimits,
    fetch_timeout: Duration,
    documents: Mutex<Collection>,
}

impl fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStore")
            .field("storage", &self.storage)
            .field("content_mode", &self.content_mode)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Opens the store described by `cfg` and loads any existing documents.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Persistence`] if the data directory cannot be prepared or the
    /// stored collection cannot be read back.
    pub fn open(
        cfg: &StoreConfig,
        gate: Arc<AccessGate>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> DocumentResult<Self> {
        std::fs::create_dir_all(cfg.data_dir()).map_err(PersistenceError::StorageDirCreation)?;

        let storage: Box<dyn DocumentStorage> = match cfg.storage() {
            StorageKind::Snapshot => Box::new(SnapshotStorage::new(cfg.snapshot_path())?),
            StorageKind::Records => Box::new(RecordStorage::new(cfg.records_dir())?),
        };

        Self::with_storage(cfg, storage, gate, fetcher)
    }

    /// Like [`DocumentStore::open`] but with a caller-supplied backend.
    pub fn with_storage(
        cfg: &StoreConfig,
        storage: Box<dyn DocumentStorage>,
        gate: Arc<AccessGate>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> DocumentResult<Self> {
        let blobs = BlobStore::new(cfg.data_dir()).map_err(PersistenceError::Blob)?;
        let documents: Collection = storage
            .load()?
            .into_iter()
            .map(|document| (document.id, document))
            .collect();

        tracing::info!(
            "opened document store at {} with {} documents",
            cfg.data_dir().display(),
            documents.len()
        );

        Ok(Self {
            storage,
            blobs,
            gate,
            fetcher,
            content_mode: cfg.content_mode(),
            limits: cfg.limits(),
            fetch_timeout: cfg.fetch_timeout(),
            documents: Mutex::new(documents),
        })
    }

    pub fn gate(&self) -> &Arc<AccessGate> {
        &self.gate
    }

    /// Validates, classifies and stores an uploaded PDF.
    ///
    /// The record is both in memory and persisted when this returns `Ok`. Nothing is recorded
    /// when it returns `Err`.
    ///
    /// # Errors
    ///
    /// - [`DocumentError::Unauthorized`] if `session` is not live
    /// - [`DocumentError::Validation`] if the candidate is rejected
    /// - [`DocumentError::Persistence`] if the content or the record cannot be written
    pub fn create(
        &self,
        session: &Session,
        candidate: &dyn PdfCandidate,
        options: UploadOptions,
    ) -> DocumentResult<Document> {
        self.gate.authorize(session)?;
        validate(candidate, &self.limits)?;

        let filename = NonEmptyText::new(candidate.filename())
            .map_err(|e| DocumentError::InvalidInput(format!("filename: {}", e)))?;
        let classification = classify(filename.as_str());
        let document_type = options.document_type.unwrap_or(classification.document_type);
        let name = match options.name {
            Some(name) => name,
            None => NonEmptyText::new(document_type.label())
                .map_err(|e| DocumentError::InvalidInput(format!("name: {}", e)))?,
        };

        // The bytes actually stored must pass the same rules as the declared candidate.
        let payload = InMemoryFile::new(
            candidate.filename(),
            candidate.content_type(),
            candidate.read_all().map_err(ValidationError::Unreadable)?,
        );
        validate(&payload, &self.limits)?;
        let bytes = payload.into_bytes();
        let file_url = match self.content_mode {
            ContentMode::Inline => ContentRef::Inline(encode_data_url(&bytes)),
            ContentMode::Blob => {
                ContentRef::Blob(self.blobs.put(&bytes).map_err(PersistenceError::Blob)?)
            }
        };

        let mut documents = self.lock();
        let id = allocate_id(&documents)?;
        let now = Utc::now();
        let document = Document {
            id,
            name,
            description: options.description,
            filename,
            file_url,
            size: bytes.len() as u64,
            document_type,
            product_type: options.product_type,
            required: options.required,
            created_at: now,
            updated_at: now,
        };

        documents.insert(id, document.clone());
        if let Err(e) = self.storage.upsert(&document, &documents) {
            documents.remove(&id);
            tracing::error!("failed to persist new document {}: {}", id, e);
            return Err(e.into());
        }

        tracing::info!(
            "created document {} ({}, {}) from {} as {}",
            id,
            document.document_type,
            document.product_type,
            document.filename,
            document.file_url.describe()
        );
        Ok(document)
    }

    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.lock().get(id).cloned()
    }

    /// Documents newest first, optionally restricted to one product category.
    pub fn list(&self, product_type: Option<ProductCategory>) -> Vec<Document> {
        let mut documents: Vec<Document> = self
            .lock()
            .values()
            .filter(|d| product_type.map_or(true, |p| d.product_type == p))
            .cloned()
            .collect();
        documents.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        documents
    }

    /// Applies `patch` to document `id` and returns the new record.
    ///
    /// # Errors
    ///
    /// [`DocumentError::Unauthorized`], [`DocumentError::NotFound`] or
    /// [`DocumentError::Persistence`]. The stored record is unchanged on error.
    pub fn update(
        &self,
        session: &Session,
        id: &DocumentId,
        patch: &DocumentPatch,
    ) -> DocumentResult<Document> {
        self.gate.authorize(session)?;

        let mut documents = self.lock();
        let previous = documents
            .get(id)
            .cloned()
            .ok_or(DocumentError::NotFound(*id))?;

        let mut updated = previous.clone();
        patch.apply(&mut updated, Utc::now().max(previous.created_at));
        documents.insert(*id, updated.clone());

        if let Err(e) = self.storage.upsert(&updated, &documents) {
            documents.insert(*id, previous);
            tracing::error!("failed to persist update of document {}: {}", id, e);
            return Err(e.into());
        }

        tracing::debug!("updated document {}", id);
        Ok(updated)
    }

    /// Removes document `id`. Stored blob content is left in place.
    ///
    /// # Errors
    ///
    /// [`DocumentError::Unauthorized`], [`DocumentError::NotFound`] (also on a second delete)
    /// or [`DocumentError::Persistence`].
    pub fn delete(&self, session: &Session, id: &DocumentId) -> DocumentResult<()> {
        self.gate.authorize(session)?;

        let mut documents = self.lock();
        let removed = documents.remove(id).ok_or(DocumentError::NotFound(*id))?;

        if let Err(e) = self.storage.remove(id, &documents) {
            documents.insert(*id, removed);
            tracing::error!("failed to persist removal of document {}: {}", id, e);
            return Err(e.into());
        }

        tracing::info!("deleted document {} ({})", id, removed.filename);
        Ok(())
    }

    /// The document's content as a self-contained `data:application/pdf;base64,…` URL.
    ///
    /// Returns `None` for unknown ids and whenever the content cannot be produced; the cause
    /// is logged.
    pub async fn export_as_inline_payload(&self, id: &DocumentId) -> Option<String> {
        let document = self.get(id)?;
        match self.inline_payload(&document.file_url).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(
                    "export of document {} from {} failed: {}",
                    id,
                    document.file_url.describe(),
                    e
                );
                None
            }
        }
    }

    /// Raw PDF bytes of a document whose content is held locally.
    ///
    /// Remote content is never fetched here and yields `None`.
    pub fn read_content(&self, id: &DocumentId) -> Option<Vec<u8>> {
        let document = self.get(id)?;
        let result = match &document.file_url {
            ContentRef::Inline(data) => decode_data_url(data).map_err(FetchError::from),
            ContentRef::Blob(hash) => self.blobs.read(hash).map_err(FetchError::from),
            ContentRef::Remote(_) => return None,
        };
        match result {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("content of document {} unavailable: {}", id, e);
                None
            }
        }
    }

    async fn inline_payload(&self, file_url: &ContentRef) -> Result<String, FetchError> {
        match file_url {
            ContentRef::Inline(data) => Ok(data.clone()),
            ContentRef::Blob(hash) => Ok(encode_data_url(&self.blobs.read(hash)?)),
            ContentRef::Remote(url) => {
                let bytes = tokio::time::timeout(self.fetch_timeout, self.fetcher.fetch(url))
                    .await
                    .map_err(|_| FetchError::Timeout(self.fetch_timeout))??;
                Ok(encode_data_url(&bytes))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Collection> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn allocate_id(documents: &Collection) -> DocumentResult<DocumentId> {
    for _ in 0..ID_ALLOCATION_ATTEMPTS {
        let id = DocumentId::new();
        if !documents.contains_key(&id) {
            return Ok(id);
        }
    }
    Err(DocumentError::InvalidInput(
        "could not allocate a unique document id".into(),
    ))
}
