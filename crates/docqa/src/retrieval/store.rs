//! On-disk layout of a persisted vector index
//!
//! ```text
//! <dir>/manifest.json   format version, embedding binding, count, checksum
//! <dir>/vectors.bin     bincode-encoded Vec<Vec<f32>>
//! <dir>/chunks.json     chunk payloads, same order as the vectors
//! ```
//!
//! Every file goes through a temp file in the same directory and is renamed
//! into place; the manifest is written last.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::types::Chunk;

/// Bumped whenever the layout or encoding changes
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const VECTORS_FILE: &str = "vectors.bin";
const CHUNKS_FILE: &str = "chunks.json";

/// The embedding space an index was built in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingBinding {
    /// Provider name (`ollama`, `hashing`, `onnx`)
    pub provider: String,
    /// Embedding model identifier
    pub model: String,
    /// Vector dimensions
    pub dimensions: usize,
}

impl std::fmt::Display for EmbeddingBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} ({}d)", self.provider, self.model, self.dimensions)
    }
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub binding: EmbeddingBinding,
    /// Number of records
    pub count: usize,
    pub created_at: DateTime<Utc>,
    /// Hex SHA-256 of `vectors.bin`
    pub vectors_sha256: String,
}

/// Records read back from disk
#[derive(Debug, Clone)]
pub struct PersistedIndex {
    pub manifest: IndexManifest,
    pub vectors: Vec<Vec<f32>>,
    pub chunks: Vec<Chunk>,
}

/// Reads and writes one index directory
#[derive(Debug, Clone)]
pub struct IndexStore {
    dir: PathBuf,
}

impl IndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when a manifest is present
    pub fn exists(&self) -> bool {
        self.dir.join(MANIFEST_FILE).is_file()
    }

    /// Write vectors, chunks and manifest
    pub fn save(&self, binding: &EmbeddingBinding, vectors: &[Vec<f32>], chunks: &[Chunk]) -> Result<IndexManifest> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::persistence(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let vector_bytes = bincode::serde::encode_to_vec(vectors, bincode::config::standard())
            .map_err(|e| Error::persistence(format!("Failed to encode vectors: {}", e)))?;
        let chunk_bytes = serde_json::to_vec(chunks)
            .map_err(|e| Error::persistence(format!("Failed to encode chunks: {}", e)))?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            binding: binding.clone(),
            count: vectors.len(),
            created_at: Utc::now(),
            vectors_sha256: hex::encode(Sha256::digest(&vector_bytes)),
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| Error::persistence(format!("Failed to encode manifest: {}", e)))?;

        // A stale manifest must not describe half-written payloads
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            std::fs::remove_file(&manifest_path)
                .map_err(|e| Error::persistence(format!("Failed to remove old manifest: {}", e)))?;
        }

        self.write_atomic(VECTORS_FILE, &vector_bytes)?;
        self.write_atomic(CHUNKS_FILE, &chunk_bytes)?;
        self.write_atomic(MANIFEST_FILE, &manifest_bytes)?;

        tracing::debug!(
            "Persisted {} vectors ({} bytes) to {}",
            manifest.count,
            vector_bytes.len(),
            self.dir.display()
        );
        Ok(manifest)
    }

    /// Read and validate the directory against the expected binding
    pub fn load(&self, expected: &EmbeddingBinding) -> Result<PersistedIndex> {
        let manifest_bytes = self.read(MANIFEST_FILE)?;
        let manifest: IndexManifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| Error::persistence(format!("Corrupt manifest: {}", e)))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(Error::persistence(format!(
                "Format version {} is not supported (expected {})",
                manifest.format_version, FORMAT_VERSION
            )));
        }
        if &manifest.binding != expected {
            return Err(Error::persistence(format!(
                "Index was built with {}, current embedder is {}",
                manifest.binding, expected
            )));
        }

        let vector_bytes = self.read(VECTORS_FILE)?;
        if hex::encode(Sha256::digest(&vector_bytes)) != manifest.vectors_sha256 {
            return Err(Error::persistence("vectors.bin checksum mismatch"));
        }
        let (vectors, _): (Vec<Vec<f32>>, usize) =
            bincode::serde::decode_from_slice(&vector_bytes, bincode::config::standard())
                .map_err(|e| Error::persistence(format!("Corrupt vectors: {}", e)))?;

        let chunk_bytes = self.read(CHUNKS_FILE)?;
        let chunks: Vec<Chunk> = serde_json::from_slice(&chunk_bytes)
            .map_err(|e| Error::persistence(format!("Corrupt chunks: {}", e)))?;

        if vectors.len() != manifest.count || chunks.len() != manifest.count {
            return Err(Error::persistence(format!(
                "Record count mismatch: manifest {}, vectors {}, chunks {}",
                manifest.count,
                vectors.len(),
                chunks.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected.dimensions) {
            return Err(Error::persistence(format!(
                "Vector has {} dimensions, expected {}",
                bad.len(),
                expected.dimensions
            )));
        }

        Ok(PersistedIndex {
            manifest,
            vectors,
            chunks,
        })
    }

    /// Delete the directory and everything in it
    pub fn remove(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(format!(
                "Failed to remove {}: {}",
                self.dir.display(),
                e
            ))),
        }
    }

    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(name);
        std::fs::read(&path).map_err(|e| Error::persistence(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let target = self.dir.join(name);
        let mut temp = NamedTempFile::new_in(&self.dir)
            .map_err(|e| Error::persistence(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(bytes)
            .and_then(|_| temp.flush())
            .map_err(|e| Error::persistence(format!("Failed to write {}: {}", name, e)))?;
        temp.persist(&target)
            .map_err(|e| Error::persistence(format!("Failed to move {} into place: {}", name, e.error)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn binding() -> EmbeddingBinding {
        EmbeddingBinding {
            provider: "hashing".to_string(),
            model: "feature-hash-3".to_string(),
            dimensions: 3,
        }
    }

    fn sample() -> (Vec<Vec<f32>>, Vec<Chunk>) {
        (
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            vec![Chunk::new("one", "a.txt", None), Chunk::new("two", "b.pdf", Some(4))],
        )
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("index"));
        let (vectors, chunks) = sample();

        assert!(!store.exists());
        store.save(&binding(), &vectors, &chunks).unwrap();
        assert!(store.exists());

        let loaded = store.load(&binding()).unwrap();
        assert_eq!(loaded.vectors, vectors);
        assert_eq!(loaded.chunks, chunks);
        assert_eq!(loaded.manifest.count, 2);
    }

    #[test]
    fn test_binding_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        let (vectors, chunks) = sample();
        store.save(&binding(), &vectors, &chunks).unwrap();

        let other = EmbeddingBinding {
            model: "all-minilm".to_string(),
            ..binding()
        };
        assert!(matches!(store.load(&other), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_corrupt_vectors_rejected() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        let (vectors, chunks) = sample();
        store.save(&binding(), &vectors, &chunks).unwrap();

        std::fs::write(dir.path().join(VECTORS_FILE), b"garbage").unwrap();
        assert!(matches!(store.load(&binding()), Err(Error::Persistence(_))));
    }

    #[test]
    fn test_missing_chunks_rejected() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path());
        let (vectors, chunks) = sample();
        store.save(&binding(), &vectors, &chunks).unwrap();

        std::fs::remove_file(dir.path().join(CHUNKS_FILE)).unwrap();
        assert!(store.load(&binding()).is_err());
    }

    #[test]
    fn test_remove_missing_dir_is_ok() {
        let dir = TempDir::new().unwrap();
        let store = IndexStore::new(dir.path().join("never-created"));
        assert!(store.remove().is_ok());
    }
}
