//! In-memory content store
//!
//! Objects are keyed by the SHA2-256 multihash of their encoding, prefixed with a
//! per-kind tag so a file can never hash to the same key as a directory. Files
//! hash their bytes; directories hash a canonical listing of their entries. Either
//! CID version can be requested on add, and lookups ignore the version.

use super::{
    AddOptions, AddedContent, ByteStream, ContentStore, DirectoryEntry, DirectoryInput, EntryKind,
    ResolvedNode, StoreError,
};
use crate::identifier::{CidVersion, ContentIdentifier, DAG_PB, RAW};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

const BLOB_TAG: &[u8] = b"blob\0";
const TREE_TAG: &[u8] = b"tree\0";

#[derive(Clone)]
enum Object {
    Blob(Bytes),
    Tree(Vec<DirectoryEntry>),
}

/// Content store held entirely in memory
pub struct MemoryStore {
    objects: RwLock<HashMap<Vec<u8>, Object>>,
    chunk_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl MemoryStore {
    /// Create an empty store that streams files in `chunk_size` pieces
    pub fn new(chunk_size: usize) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Number of distinct objects held
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn import_tree(
        &self,
        inputs: Vec<DirectoryInput>,
        version: CidVersion,
    ) -> Result<Vec<AddedContent>, StoreError> {
        let mut root = TreeBuilder::default();
        let mut files = Vec::with_capacity(inputs.len());
        for input in inputs {
            let components = split_path(&input.path)?;
            root.insert(&components, input.path.clone())?;
            files.push((components.join("/"), input.content));
        }

        let mut objects = self.objects.write().await;
        let mut added = Vec::new();
        let mut stored_files = HashMap::new();

        for (path, content) in files {
            let (identifier, size) = put_blob(&mut objects, content, version);
            added.push(AddedContent {
                path: path.clone(),
                identifier,
                size,
            });
            stored_files.insert(path, (identifier, size));
        }

        for name in &root.order {
            if let Some(TreeChild::Dir(dir)) = root.children.get(name) {
                store_dir(&mut objects, name, dir, &stored_files, version, &mut added)?;
            }
        }

        Ok(added)
    }

    fn chunked(&self, data: Bytes) -> ByteStream {
        let chunk_size = self.chunk_size;
        stream::unfold(data, move |mut rest| async move {
            if rest.is_empty() {
                return None;
            }
            let chunk = rest.split_to(chunk_size.min(rest.len()));
            Some((Ok(chunk), rest))
        })
        .boxed()
    }

    async fn get(&self, identifier: &ContentIdentifier) -> Result<Object, StoreError> {
        self.objects
            .read()
            .await
            .get(&identifier.content_key())
            .cloned()
            .ok_or(StoreError::NotFound(*identifier))
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn add_content(&self, content: Bytes, options: AddOptions) -> Result<AddedContent, StoreError> {
        let mut objects = self.objects.write().await;
        let (identifier, size) = put_blob(&mut objects, content, options.cid_version);
        Ok(AddedContent {
            path: identifier.to_string(),
            identifier,
            size,
        })
    }

    fn add_directory(
        &self,
        entries: Vec<DirectoryInput>,
        options: AddOptions,
    ) -> BoxStream<'_, Result<AddedContent, StoreError>> {
        stream::once(self.import_tree(entries, options.cid_version))
            .flat_map(|result| match result {
                Ok(added) => stream::iter(added.into_iter().map(Ok)).left_stream(),
                Err(e) => stream::once(async move { Err(e) }).right_stream(),
            })
            .boxed()
    }

    async fn fetch_node(&self, identifier: &ContentIdentifier) -> Result<ResolvedNode, StoreError> {
        match self.get(identifier).await? {
            Object::Blob(data) => Ok(ResolvedNode::File {
                identifier: *identifier,
                size: data.len() as u64,
                body: self.chunked(data),
            }),
            Object::Tree(entries) => Ok(ResolvedNode::Directory {
                identifier: *identifier,
                entries,
            }),
        }
    }

    async fn list_directory(&self, identifier: &ContentIdentifier) -> Result<Vec<DirectoryEntry>, StoreError> {
        match self.get(identifier).await? {
            Object::Tree(entries) => Ok(entries),
            Object::Blob(_) => Err(StoreError::NotADirectory(*identifier)),
        }
    }
}

/// Directory being assembled from import paths, children in first-seen order
#[derive(Default)]
struct TreeBuilder {
    order: Vec<String>,
    children: HashMap<String, TreeChild>,
}

enum TreeChild {
    File,
    Dir(TreeBuilder),
}

impl TreeBuilder {
    fn insert(&mut self, components: &[String], original: String) -> Result<(), StoreError> {
        let Some((name, rest)) = components.split_first() else {
            return Err(StoreError::InvalidPath(original));
        };

        if !self.children.contains_key(name) {
            self.order.push(name.clone());
            let child = if rest.is_empty() {
                TreeChild::File
            } else {
                TreeChild::Dir(Self::default())
            };
            self.children.insert(name.clone(), child);
        }

        match (self.children.get_mut(name), rest.is_empty()) {
            (Some(TreeChild::File), true) => Ok(()),
            (Some(TreeChild::Dir(dir)), false) => dir.insert(rest, original),
            // A name used both as a file and as a directory
            _ => Err(StoreError::InvalidPath(original)),
        }
    }
}

fn split_path(path: &str) -> Result<Vec<String>, StoreError> {
    let components: Vec<String> = path
        .split('/')
        .filter(|c| !c.is_empty())
        .map(ToString::to_string)
        .collect();

    if components.is_empty() || components.iter().any(|c| c == "." || c == "..") {
        return Err(StoreError::InvalidPath(path.to_string()));
    }
    Ok(components)
}

fn put_blob(
    objects: &mut HashMap<Vec<u8>, Object>,
    content: Bytes,
    version: CidVersion,
) -> (ContentIdentifier, u64) {
    let identifier = ContentIdentifier::from_sha256(&tagged_digest(BLOB_TAG, &content), RAW, version);
    let size = content.len() as u64;
    objects
        .entry(identifier.content_key())
        .or_insert(Object::Blob(content));
    (identifier, size)
}

/// Store `dir` and everything below it, reporting each directory after its children
fn store_dir(
    objects: &mut HashMap<Vec<u8>, Object>,
    path: &str,
    dir: &TreeBuilder,
    stored_files: &HashMap<String, (ContentIdentifier, u64)>,
    version: CidVersion,
    added: &mut Vec<AddedContent>,
) -> Result<DirectoryEntry, StoreError> {
    let mut entries = Vec::with_capacity(dir.order.len());

    for name in &dir.order {
        let child_path = format!("{path}/{name}");
        let entry = match dir.children.get(name) {
            Some(TreeChild::File) => {
                let (identifier, size) = stored_files
                    .get(&child_path)
                    .copied()
                    .ok_or_else(|| StoreError::Backend(format!("file '{child_path}' was not stored")))?;
                DirectoryEntry {
                    name: name.clone(),
                    identifier,
                    kind: EntryKind::File,
                    size,
                }
            }
            Some(TreeChild::Dir(sub)) => {
                let stored = store_dir(objects, &child_path, sub, stored_files, version, added)?;
                DirectoryEntry {
                    name: name.clone(),
                    ..stored
                }
            }
            None => continue,
        };
        entries.push(entry);
    }

    let encoded = encode_tree(&entries);
    let identifier = ContentIdentifier::from_sha256(&tagged_digest(TREE_TAG, &encoded), DAG_PB, version);
    let size = entries.iter().map(|e| e.size).sum::<u64>() + encoded.len() as u64;

    objects
        .entry(identifier.content_key())
        .or_insert_with(|| Object::Tree(entries));

    added.push(AddedContent {
        path: path.to_string(),
        identifier,
        size,
    });

    Ok(DirectoryEntry {
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        identifier,
        kind: EntryKind::Directory,
        size,
    })
}

fn tagged_digest(tag: &[u8], data: &[u8]) -> [u8; 32] {
    Sha256::new().chain_update(tag).chain_update(data).finalize().into()
}

/// Canonical directory encoding. Entries are written in their canonical form, so
/// the same tree imported as v0 or v1 hashes alike.
fn encode_tree(entries: &[DirectoryEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        let kind = match entry.kind {
            EntryKind::File => 'f',
            EntryKind::Directory => 'd',
        };
        let line = format!(
            "{kind} {} {} {}:{}\n",
            entry.size,
            entry.identifier.canonical(),
            entry.name.len(),
            entry.name
        );
        out.extend_from_slice(line.as_bytes());
    }
    out
}
