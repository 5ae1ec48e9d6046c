//! Storage collaborator module
//!
//! The gateway never hashes or verifies content itself. It talks to storage through
//! [`ContentStore`], which adds content and hands back nodes by identifier.

mod memory;
pub mod seed;

pub use memory::{MemoryStore, DEFAULT_CHUNK_SIZE};

use crate::identifier::{CidVersion, ContentIdentifier};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;

/// Chunked file contents, read at the consumer's pace
pub type ByteStream = BoxStream<'static, Result<Bytes, StoreError>>;

/// Storage layer failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no content stored under {0}")]
    NotFound(ContentIdentifier),

    #[error("{0} is not a directory")]
    NotADirectory(ContentIdentifier),

    #[error("invalid content path '{0}'")]
    InvalidPath(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Kind of a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Named link inside a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub identifier: ContentIdentifier,
    pub kind: EntryKind,
    pub size: u64,
}

/// A node after resolution: file bytes or a directory's entries
pub enum ResolvedNode {
    File {
        identifier: ContentIdentifier,
        size: u64,
        body: ByteStream,
    },
    Directory {
        identifier: ContentIdentifier,
        entries: Vec<DirectoryEntry>,
    },
}

impl ResolvedNode {
    pub const fn identifier(&self) -> &ContentIdentifier {
        match self {
            Self::File { identifier, .. } | Self::Directory { identifier, .. } => identifier,
        }
    }

    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::File { .. } => EntryKind::File,
            Self::Directory { .. } => EntryKind::Directory,
        }
    }
}

impl fmt::Debug for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File {
                identifier, size, ..
            } => f
                .debug_struct("File")
                .field("identifier", identifier)
                .field("size", size)
                .finish_non_exhaustive(),
            Self::Directory {
                identifier,
                entries,
            } => f
                .debug_struct("Directory")
                .field("identifier", identifier)
                .field("entries", entries)
                .finish(),
        }
    }
}

/// Options for adding content
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    pub cid_version: CidVersion,
}

/// One file of a directory import; `path` is relative, `/`-separated
#[derive(Debug, Clone)]
pub struct DirectoryInput {
    pub path: String,
    pub content: Bytes,
}

/// Result of adding a file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedContent {
    pub path: String,
    pub identifier: ContentIdentifier,
    pub size: u64,
}

/// Content-addressed storage as seen by the gateway
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store a single file
    async fn add_content(&self, content: Bytes, options: AddOptions) -> Result<AddedContent, StoreError>;

    /// Store a tree of files. Files are reported first, each directory after its
    /// children, and the top-level directory last.
    fn add_directory(
        &self,
        entries: Vec<DirectoryInput>,
        options: AddOptions,
    ) -> BoxStream<'_, Result<AddedContent, StoreError>>;

    /// Load a node; files come back with an unread byte stream
    async fn fetch_node(&self, identifier: &ContentIdentifier) -> Result<ResolvedNode, StoreError>;

    /// Entries of a directory, in stored order
    async fn list_directory(&self, identifier: &ContentIdentifier) -> Result<Vec<DirectoryEntry>, StoreError>;
}

/// Drain a byte stream into memory (test helper)
#[cfg(test)]
pub(crate) async fn collect(body: ByteStream) -> Vec<u8> {
    use futures::TryStreamExt;

    body.try_fold(Vec::new(), |mut acc, chunk| async move {
        acc.extend_from_slice(&chunk);
        Ok(acc)
    })
    .await
    .unwrap()
}
