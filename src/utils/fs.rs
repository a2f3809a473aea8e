//! File system utilities.

use crate::Result;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;
use walkdir::WalkDir;

/// Check that a path is relative and stays inside the project root.
pub fn is_safe_relative(path: &Path) -> bool {
    if path.as_os_str().is_empty() {
        return false;
    }
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Write a file so that readers never observe partial content.
///
/// Content goes to a temporary sibling first, is synced, then renamed over
/// the target.
pub async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        tokio::fs::create_dir_all(&parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let tmp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let write_result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(contents).await?;
        file.sync_all().await?;
        Ok::<_, std::io::Error>(())
    }
    .await;

    if let Err(e) = write_result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e.into());
    }

    tracing::debug!("Wrote {:?} ({} bytes)", path, contents.len());
    Ok(())
}

/// Size of a file, or the total size of the files under a directory.
pub fn path_size(path: &Path) -> u64 {
    if path.is_dir() {
        WalkDir::new(path)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    } else {
        std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
    }
}

/// Pick a backup path for `relative` under `backup_root` that does not exist yet.
pub fn unique_backup_path(backup_root: &Path, relative: &Path, timestamp: &str) -> PathBuf {
    let file_name = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let dir = match relative.parent() {
        Some(p) => backup_root.join(p),
        None => backup_root.to_path_buf(),
    };

    let base = dir.join(format!("{}.{}.bak", file_name, timestamp));
    if !base.exists() {
        return base;
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{}.{}.bak.{}", file_name, timestamp, n));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}
