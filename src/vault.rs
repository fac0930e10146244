//! File upload and download on top of the chunk store and metadata tree.
//!
//! An upload is split into fixed-size chunks keyed by their content hash.
//! Chunks are stored first and the file metadata is saved last, so a
//! committed file never references a chunk that was not written.

use tracing::info;

use crate::chunk::{content_hash, ChunkStore, FsChunkBackend, PutOutcome};
use crate::config::Config;
use crate::db::Database;
use crate::tree::{self, MetadataService, SaveRequest};
use crate::{Result, SkyvaultError};

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// ID of the file node.
    pub node_id: i64,
    /// Chunk hashes in file order.
    pub chunk_hashes: Vec<String>,
    /// Chunks that were newly written.
    pub stored_chunks: usize,
    /// Chunks that were already present.
    pub deduplicated_chunks: usize,
}

/// Chunked file storage with a metadata tree.
#[derive(Debug, Clone)]
pub struct Vault {
    metadata: MetadataService,
    chunks: ChunkStore<FsChunkBackend>,
    chunk_size: usize,
}

impl Vault {
    /// Open the database and chunk directory named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let db = Database::open(&config.database.path).await?;
        let backend = FsChunkBackend::new(&config.chunks.storage_path)?;
        let chunks = ChunkStore::new(backend).with_verification(config.chunks.verify_hashes);
        let metadata = MetadataService::new(db).await?;

        Self::new(metadata, chunks, config.chunks.chunk_size_bytes)
    }

    pub fn new(
        metadata: MetadataService,
        chunks: ChunkStore<FsChunkBackend>,
        chunk_size: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(SkyvaultError::InvalidRequest(
                "chunk size must be positive".to_string(),
            ));
        }
        Ok(Self {
            metadata,
            chunks,
            chunk_size,
        })
    }

    pub fn metadata(&self) -> &MetadataService {
        &self.metadata
    }

    pub fn chunks(&self) -> &ChunkStore<FsChunkBackend> {
        &self.chunks
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Store `content` as `file_name` under `folder_path`.
    ///
    /// Missing folders are created. An existing file with the same name is
    /// replaced; its chunks stay in the store.
    pub async fn upload(
        &self,
        folder_path: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<UploadReceipt> {
        // Reject bad names before any chunk is written.
        tree::file_type(file_name)?;
        if content.is_empty() {
            return Err(SkyvaultError::InvalidRequest(format!(
                "file '{file_name}' is empty"
            )));
        }

        let mut chunk_hashes = Vec::with_capacity(content.len().div_ceil(self.chunk_size));
        let mut stored_chunks = 0;
        let mut deduplicated_chunks = 0;

        for piece in content.chunks(self.chunk_size) {
            let hash = content_hash(piece);
            match self.chunks.put(&hash, piece)? {
                PutOutcome::Stored => stored_chunks += 1,
                PutOutcome::Deduplicated => deduplicated_chunks += 1,
            }
            chunk_hashes.push(hash);
        }

        let file_size = i64::try_from(content.len()).map_err(|_| {
            SkyvaultError::InvalidRequest(format!("file '{file_name}' is too large"))
        })?;
        let request = SaveRequest::file(folder_path, file_name, file_size, chunk_hashes.clone());
        let node_id = self.metadata.save(&request).await?;

        info!(
            "Uploaded '{}' to '{}' as node {} ({} new chunk(s), {} deduplicated)",
            file_name, folder_path, node_id, stored_chunks, deduplicated_chunks
        );

        Ok(UploadReceipt {
            node_id,
            chunk_hashes,
            stored_chunks,
            deduplicated_chunks,
        })
    }

    /// Reassemble the content of file node `node_id`.
    ///
    /// Fails with `NotFound` if the node is not a file or any of its chunks
    /// is missing from the store.
    pub async fn download(&self, node_id: i64) -> Result<Vec<u8>> {
        let details = self.metadata.fetch(node_id).await?;

        let mut content = Vec::with_capacity(usize::try_from(details.file_size).unwrap_or(0));
        for hash in &details.chunk_hashes {
            content.extend_from_slice(&self.chunks.get(hash)?);
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tempfile::TempDir;

    async fn setup(chunk_size: usize) -> (TempDir, Vault) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let metadata = MetadataService::new(db).await.unwrap();
        let chunks =
            ChunkStore::new(FsChunkBackend::new(temp_dir.path()).unwrap()).with_verification(true);
        let vault = Vault::new(metadata, chunks, chunk_size).unwrap();
        (temp_dir, vault)
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let (_temp_dir, vault) = setup(4).await;
        let content = b"hello, chunked world";

        let receipt = vault.upload("docs", "hello.txt", content).await.unwrap();
        assert_eq!(receipt.chunk_hashes.len(), 5);
        assert_eq!(receipt.stored_chunks, 5);

        let details = vault.metadata().fetch(receipt.node_id).await.unwrap();
        assert_eq!(details.file_size, content.len() as i64);
        assert_eq!(details.file_type, "txt");
        assert_eq!(details.chunk_hashes, receipt.chunk_hashes);

        assert_eq!(vault.download(receipt.node_id).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_identical_chunks_stored_once() {
        let (_temp_dir, vault) = setup(4).await;

        let first = vault.upload("", "a.bin", b"abcdabcd").await.unwrap();
        assert_eq!(first.stored_chunks, 1);
        assert_eq!(first.deduplicated_chunks, 1);
        assert_eq!(first.chunk_hashes[0], first.chunk_hashes[1]);

        let second = vault.upload("copy", "b.bin", b"abcdabcd").await.unwrap();
        assert_eq!(second.stored_chunks, 0);
        assert_eq!(second.deduplicated_chunks, 2);

        assert_eq!(vault.download(second.node_id).await.unwrap(), b"abcdabcd");
    }

    #[tokio::test]
    async fn test_upload_rejects_before_writing() {
        let (_temp_dir, vault) = setup(4).await;

        let err = vault.upload("", "README", b"data").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
        assert!(!vault.chunks().exists(&content_hash(b"data")).unwrap());

        let err = vault.upload("", "empty.txt", b"").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_download_missing_chunk() {
        let (_temp_dir, vault) = setup(4).await;
        let receipt = vault.upload("", "gone.txt", b"12345678").await.unwrap();

        vault.chunks().delete(&receipt.chunk_hashes[1]).unwrap();

        let err = vault.download(receipt.node_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_download_folder_is_not_found() {
        let (_temp_dir, vault) = setup(4).await;
        let folder = vault.metadata().save(&SaveRequest::folder("a")).await.unwrap();

        let err = vault.download(folder).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_zero_chunk_size_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let metadata = MetadataService::new(db).await.unwrap();
        let chunks = ChunkStore::new(FsChunkBackend::new(temp_dir.path()).unwrap());

        assert!(Vault::new(metadata, chunks, 0).is_err());
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = temp_dir.path().join("vault.db").display().to_string();
        config.chunks.storage_path = temp_dir.path().join("chunks").display().to_string();
        config.chunks.chunk_size_bytes = 3;

        let vault = Vault::open(&config).await.unwrap();
        let receipt = vault.upload("x/y", "z.dat", b"abcdefg").await.unwrap();
        assert_eq!(receipt.chunk_hashes.len(), 3);
        assert_eq!(vault.download(receipt.node_id).await.unwrap(), b"abcdefg");

        vault.metadata().database().close().await;
    }
}
