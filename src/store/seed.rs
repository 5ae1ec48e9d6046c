//! Import local files and directories into a content store at startup

use super::{AddOptions, AddedContent, ContentStore, DirectoryInput, StoreError};
use bytes::Bytes;
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Add a local file or directory tree and return its root record.
///
/// Directory children are imported in name order so the same tree always gets the
/// same identifier.
pub async fn import_path<S>(store: &S, path: &Path, options: AddOptions) -> Result<AddedContent, StoreError>
where
    S: ContentStore + ?Sized,
{
    let metadata = fs::metadata(path).await?;

    if metadata.is_file() {
        let content = fs::read(path).await?;
        let mut added = store.add_content(Bytes::from(content), options).await?;
        added.path = file_name(path)?;
        tracing::info!(path = %path.display(), cid = %added.identifier, size = added.size, "imported file");
        return Ok(added);
    }

    let root_name = file_name(path)?;
    let mut inputs = Vec::new();
    collect_files(path, &root_name, &mut inputs).await?;
    if inputs.is_empty() {
        return Err(StoreError::InvalidPath(format!("{} contains no files", path.display())));
    }

    let added: Vec<AddedContent> = store.add_directory(inputs, options).try_collect().await?;
    let root = added
        .into_iter()
        .rev()
        .find(|a| a.path == root_name)
        .ok_or_else(|| StoreError::Backend(format!("no root reported for {root_name}")))?;

    tracing::info!(path = %path.display(), cid = %root.identifier, size = root.size, "imported directory");
    Ok(root)
}

async fn collect_files(dir: &Path, prefix: &str, out: &mut Vec<DirectoryInput>) -> Result<(), StoreError> {
    let mut children: Vec<PathBuf> = Vec::new();
    let mut reader = fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        children.push(entry.path());
    }
    children.sort();

    for child in children {
        let name = file_name(&child)?;
        let relative = format!("{prefix}/{name}");
        let metadata = fs::metadata(&child).await?;
        if metadata.is_dir() {
            Box::pin(collect_files(&child, &relative, out)).await?;
        } else if metadata.is_file() {
            let content = fs::read(&child).await?;
            out.push(DirectoryInput {
                path: relative,
                content: Bytes::from(content),
            });
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> Result<String, StoreError> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(ToString::to_string)
        .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))
}
