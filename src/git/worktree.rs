use anyhow::{Context, Result};
use std::path::Path;

use super::status::{changed_files, file_at_rev, FileStatus};
use crate::diff::{diff_texts, DiffChunkType, FileDiff, WorktreeDiff};

/// Build a chunk diff of the working tree against `base`, one entry per changed file.
/// Files whose content is unchanged (mode-only changes) are left out.
pub fn worktree_diff(repo_root: &str, base: &str) -> Result<WorktreeDiff> {
    let mut files = Vec::new();

    for changed in changed_files(repo_root, base)? {
        let old = match changed.status {
            FileStatus::Added => String::new(),
            _ => file_at_rev(repo_root, base, changed.old_path())?,
        };
        let new = match changed.status {
            FileStatus::Deleted => String::new(),
            _ => read_working_file(repo_root, &changed.path)?,
        };

        let chunks = diff_texts(&old, &new);
        if chunks.iter().all(|c| c.chunk_type == DiffChunkType::Equal) {
            log::debug!("skipping {}: no content change", changed.path);
            continue;
        }
        files.push(FileDiff {
            path: changed.path,
            chunks,
        });
    }

    log::info!("built diff of {} files against {}", files.len(), base);
    Ok(WorktreeDiff { files })
}

fn read_working_file(repo_root: &str, path: &str) -> Result<String> {
    let full = Path::new(repo_root).join(path);
    if !full.exists() {
        return Ok(String::new());
    }
    let bytes =
        std::fs::read(&full).with_context(|| format!("Failed to read '{}'", full.display()))?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}
