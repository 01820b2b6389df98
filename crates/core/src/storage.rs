//! Durable backends for the document collection.
//!
//! The store keeps the authoritative collection in memory and calls a [`DocumentStorage`] after
//! each mutation. Two backends are provided:
//!
//! - [`SnapshotStorage`]: the whole collection as one JSON array, rewritten atomically
//! - [`RecordStorage`]: one YAML file per document under a sharded directory tree
//!
//! Both leave the previous durable state intact when a write fails.

use crate::constants::RECORD_FILENAME;
use crate::{Document, PersistenceError};
use specsheet_uuid::DocumentId;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// The in-memory collection, keyed by id.
pub type Collection = BTreeMap<DocumentId, Document>;

/// Persistence seam used by [`crate::DocumentStore`].
///
/// `collection` is the state *after* the mutation, for backends that rewrite everything.
pub trait DocumentStorage: Send + Sync + Debug {
    /// Loads every stored document.
    fn load(&self) -> Result<Vec<Document>, PersistenceError>;

    /// Persists a created or updated document.
    fn upsert(&self, document: &Document, collection: &Collection) -> Result<(), PersistenceError>;

    /// Persists the removal of `id`.
    fn remove(&self, id: &DocumentId, collection: &Collection) -> Result<(), PersistenceError>;
}

/// Whole-collection JSON snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotStorage {
    path: PathBuf,
}

impl SnapshotStorage {
    pub fn new(path: PathBuf) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(PersistenceError::StorageDirCreation)?;
            }
        }
        Ok(Self { path })
    }

    fn write(&self, collection: &Collection) -> Result<(), PersistenceError> {
        let documents: Vec<&Document> = collection.values().collect();
        let json = serde_json::to_vec_pretty(&documents).map_err(PersistenceError::Serialization)?;

        write_synced(&self.path, &self.path.with_extension("json.tmp"), &json)
            .map_err(PersistenceError::SnapshotWrite)
    }
}

/// Writes `bytes` to `temp_path`, syncs it, then renames it over `path`.
fn write_synced(path: &Path, temp_path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, path)
}

impl DocumentStorage for SnapshotStorage {
    fn load(&self) -> Result<Vec<Document>, PersistenceError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::SnapshotRead(e)),
        };

        let documents: Vec<Document> =
            serde_json::from_slice(&bytes).map_err(PersistenceError::Deserialization)?;

        let mut seen = HashSet::with_capacity(documents.len());
        for document in &documents {
            if !seen.insert(document.id) {
                return Err(PersistenceError::DuplicateId(document.id));
            }
        }

        Ok(documents)
    }

    fn upsert(&self, _document: &Document, collection: &Collection) -> Result<(), PersistenceError> {
        self.write(collection)
    }

    fn remove(&self, _id: &DocumentId, collection: &Collection) -> Result<(), PersistenceError> {
        self.write(collection)
    }
}

/// One YAML record per document at `<root>/<s1>/<s2>/<id>/document.yaml`.
#[derive(Debug, Clone)]
pub struct RecordStorage {
    root: PathBuf,
}

impl RecordStorage {
    pub fn new(root: PathBuf) -> Result<Self, PersistenceError> {
        fs::create_dir_all(&root).map_err(PersistenceError::StorageDirCreation)?;
        Ok(Self { root })
    }

    pub fn record_path(&self, id: &DocumentId) -> PathBuf {
        id.sharded_dir(&self.root).join(RECORD_FILENAME)
    }

    fn read_record(&self, dir_name: &str, path: &Path) -> Result<Document, PersistenceError> {
        let contents = fs::read_to_string(path).map_err(|source| PersistenceError::RecordRead {
            path: path.to_path_buf(),
            source,
        })?;
        let document: Document =
            serde_yaml::from_str(&contents).map_err(|source| {
                PersistenceError::YamlDeserialization {
                    path: path.to_path_buf(),
                    source,
                }
            })?;

        if document.id.to_string() != dir_name {
            return Err(PersistenceError::RecordIdMismatch {
                path: path.to_path_buf(),
            });
        }
        Ok(document)
    }
}

impl DocumentStorage for RecordStorage {
    fn load(&self) -> Result<Vec<Document>, PersistenceError> {
        let mut documents = Vec::new();

        let s1_iter = match fs::read_dir(&self.root) {
            Ok(it) => it,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(documents),
            Err(e) => {
                return Err(PersistenceError::RecordRead {
                    path: self.root.clone(),
                    source: e,
                })
            }
        };

        for s1 in s1_iter.flatten() {
            let s1_path = s1.path();
            if !s1_path.is_dir() {
                continue;
            }

            let s2_iter = match fs::read_dir(&s1_path) {
                Ok(it) => it,
                Err(_) => continue,
            };

            for s2 in s2_iter.flatten() {
                let s2_path = s2.path();
                if !s2_path.is_dir() {
                    continue;
                }

                let id_iter = match fs::read_dir(&s2_path) {
                    Ok(it) => it,
                    Err(_) => continue,
                };

                for id_ent in id_iter.flatten() {
                    let id_path = id_ent.path();
                    if !id_path.is_dir() {
                        continue;
                    }

                    let record_path = id_path.join(RECORD_FILENAME);
                    if !record_path.is_file() {
                        continue;
                    }

                    let dir_name = id_ent.file_name().to_string_lossy().into_owned();
                    documents.push(self.read_record(&dir_name, &record_path)?);
                }
            }
        }

        Ok(documents)
    }

    fn upsert(&self, document: &Document, _collection: &Collection) -> Result<(), PersistenceError> {
        let record_path = self.record_path(&document.id);
        if let Some(parent) = record_path.parent() {
            fs::create_dir_all(parent).map_err(PersistenceError::RecordWrite)?;
        }

        let yaml = serde_yaml::to_string(document).map_err(PersistenceError::YamlSerialization)?;

        write_synced(
            &record_path,
            &record_path.with_extension("yaml.tmp"),
            yaml.as_bytes(),
        )
        .map_err(PersistenceError::RecordWrite)
    }

    fn remove(&self, id: &DocumentId, _collection: &Collection) -> Result<(), PersistenceError> {
        let dir = id.sharded_dir(&self.root);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::RecordRemove(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentRef;
    use chrono::Utc;
    use specsheet_types::{DocumentType, NonEmptyText, ProductCategory};
    use tempfile::TempDir;

    fn document(name: &str) -> Document {
        let now = Utc::now();
        Document {
            id: DocumentId::new(),
            name: NonEmptyText::new(name).unwrap(),
            description: "fixture".into(),
            filename: NonEmptyText::new(format!("{name}.pdf")).unwrap(),
            file_url: ContentRef::Remote(format!("https://cdn.example.com/{name}.pdf")),
            size: 4096,
            document_type: DocumentType::Warranty,
            product_type: ProductCategory::Walls,
            required: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn collection_of(documents: &[Document]) -> Collection {
        documents.iter().map(|d| (d.id, d.clone())).collect()
    }

    fn sorted_ids(mut documents: Vec<Document>) -> Vec<DocumentId> {
        documents.sort_by_key(|d| d.id);
        documents.into_iter().map(|d| d.id).collect()
    }

    #[test]
    fn snapshot_load_of_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let storage = SnapshotStorage::new(temp.path().join("documents.json")).unwrap();
        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn snapshot_round_trips_collection() {
        let temp = TempDir::new().unwrap();
        let storage = SnapshotStorage::new(temp.path().join("documents.json")).unwrap();
        let a = document("a");
        let b = document("b");
        let mut collection = collection_of(&[a.clone(), b.clone()]);

        storage.upsert(&b, &collection).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(loaded.contains(&a));
        assert!(loaded.contains(&b));

        collection.remove(&a.id);
        storage.remove(&a.id, &collection).unwrap();
        assert_eq!(storage.load().unwrap(), vec![b]);
        assert!(!temp.path().join("documents.json.tmp").exists());
    }

    #[test]
    fn snapshot_rejects_duplicate_ids() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.json");
        let a = document("a");
        fs::write(&path, serde_json::to_vec(&vec![a.clone(), a]).unwrap()).unwrap();

        let storage = SnapshotStorage::new(path).unwrap();
        assert!(matches!(
            storage.load(),
            Err(PersistenceError::DuplicateId(_))
        ));
    }

    #[test]
    fn snapshot_rejects_corrupt_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("documents.json");
        fs::write(&path, b"{ not json").unwrap();

        let storage = SnapshotStorage::new(path).unwrap();
        assert!(matches!(
            storage.load(),
            Err(PersistenceError::Deserialization(_))
        ));
    }

    #[test]
    fn records_are_sharded_by_id() {
        let temp = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp.path().join("records")).unwrap();
        let a = document("a");

        storage.upsert(&a, &collection_of(&[a.clone()])).unwrap();

        let id = a.id.to_string();
        let expected = temp
            .path()
            .join("records")
            .join(&id[0..2])
            .join(&id[2..4])
            .join(&id)
            .join(RECORD_FILENAME);
        assert_eq!(storage.record_path(&a.id), expected);
        assert!(expected.is_file());
    }

    #[test]
    fn records_round_trip_and_remove() {
        let temp = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp.path().join("records")).unwrap();
        let a = document("a");
        let b = document("b");
        let collection = collection_of(&[a.clone(), b.clone()]);

        storage.upsert(&a, &collection).unwrap();
        storage.upsert(&b, &collection).unwrap();
        assert_eq!(
            sorted_ids(storage.load().unwrap()),
            sorted_ids(vec![a.clone(), b.clone()])
        );

        storage.remove(&a.id, &collection).unwrap();
        assert_eq!(storage.load().unwrap(), vec![b]);
        assert!(!a.id.sharded_dir(&temp.path().join("records")).exists());

        // Removing again is not an error.
        storage.remove(&a.id, &collection).unwrap();
    }

    #[test]
    fn record_upsert_replaces_in_place() {
        let temp = TempDir::new().unwrap();
        let storage = RecordStorage::new(temp.path().join("records")).unwrap();
        let mut a = document("a");
        storage.upsert(&a, &collection_of(&[a.clone()])).unwrap();

        a.description = "revised".into();
        storage.upsert(&a, &collection_of(&[a.clone()])).unwrap();

        assert_eq!(storage.load().unwrap(), vec![a.clone()]);
        let record_dir = a.id.sharded_dir(&temp.path().join("records"));
        assert_eq!(fs::read_dir(&record_dir).unwrap().count(), 1);
        assert!(!storage.record_path(&a.id).with_extension("yaml.tmp").exists());
    }

    #[test]
    fn records_reject_id_mismatch() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("records");
        let storage = RecordStorage::new(root.clone()).unwrap();
        let a = document("a");
        let b = document("b");

        let wrong_dir = b.id.sharded_dir(&root);
        fs::create_dir_all(&wrong_dir).unwrap();
        fs::write(
            wrong_dir.join(RECORD_FILENAME),
            serde_yaml::to_string(&a).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            storage.load(),
            Err(PersistenceError::RecordIdMismatch { .. })
        ));
    }

    #[test]
    fn records_reject_corrupt_yaml() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("records");
        let storage = RecordStorage::new(root.clone()).unwrap();
        let a = document("a");

        let dir = a.id.sharded_dir(&root);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(RECORD_FILENAME), "name: [unterminated").unwrap();

        assert!(matches!(
            storage.load(),
            Err(PersistenceError::YamlDeserialization { .. })
        ));
    }
}
