//! Content resolver
//!
//! Walks a [`GatewayPath`] segment by segment through the store. Descent is strictly
//! sequential since each lookup depends on the directory found by the previous one.

use crate::error::GatewayError;
use crate::fallback;
use crate::gateway::path::GatewayPath;
use crate::store::{ContentStore, DirectoryEntry, EntryKind, ResolvedNode};
use std::sync::Arc;

pub struct Resolver<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for Resolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Resolver<S>
where
    S: ContentStore + ?Sized,
{
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolve the node a path points at.
    ///
    /// Fails with `ContentNotFound` when the store lacks the root, and with `NotFound`
    /// when a segment is missing or the path continues past a file.
    pub async fn resolve(&self, path: &GatewayPath) -> Result<ResolvedNode, GatewayError> {
        let mut node = self.store.fetch_node(&path.identifier).await?;
        let mut walked = format!("/{}", path.identifier);

        for (i, segment) in path.segments.iter().enumerate() {
            let entry = match &node {
                ResolvedNode::File { .. } => return Err(GatewayError::not_found(walked, segment.as_str())),
                ResolvedNode::Directory { entries, .. } => match find_entry(entries, segment) {
                    Some(entry) => entry.clone(),
                    None => return Err(GatewayError::not_found(walked, segment.as_str())),
                },
            };

            let is_last = i + 1 == path.segments.len();
            node = if entry.kind == EntryKind::Directory && !is_last {
                ResolvedNode::Directory {
                    entries: self.store.list_directory(&entry.identifier).await?,
                    identifier: entry.identifier,
                }
            } else {
                self.store.fetch_node(&entry.identifier).await?
            };

            walked.push('/');
            walked.push_str(segment);
        }

        tracing::debug!(path = %walked, cid = %node.identifier(), kind = ?node.kind(), "resolved");
        Ok(node)
    }

    /// Resolve the literal path, then, if allowed, the path with `.html` appended to an
    /// extensionless last segment. Returns the path that matched along with its node;
    /// the last failure is reported when neither exists.
    pub async fn resolve_with_fallback(
        &self,
        path: &GatewayPath,
        html_fallback: bool,
    ) -> Result<(GatewayPath, ResolvedNode), GatewayError> {
        let mut strategies = vec![path.clone()];
        if html_fallback {
            if let Some(name) = path.file_name().filter(|n| !n.contains('.')) {
                strategies.push(path.with_last_segment(format!("{name}.html")));
            }
        }

        let attempts = strategies
            .into_iter()
            .map(|candidate| {
                move || async move {
                    let node = self.resolve(&candidate).await?;
                    Ok::<_, GatewayError>((candidate, node))
                }
            });

        Ok(fallback::try_each(attempts).await?)
    }
}

/// Exact, case-sensitive lookup of a name in a directory
pub fn find_entry<'a>(entries: &'a [DirectoryEntry], name: &str) -> Option<&'a DirectoryEntry> {
    entries.iter().find(|e| e.name == name)
}
