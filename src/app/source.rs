use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::diff::{diff_texts, load_worktree_diff, FileDiff, WorktreeDiff};
use crate::git;

/// Where the diff on screen comes from
#[derive(Debug, Clone, PartialEq)]
pub enum DiffSource {
    /// A JSON file in the backend's `{"files": [{path, chunks}]}` format
    Json(PathBuf),
    /// Two plain files compared line by line
    Texts { old: PathBuf, new: PathBuf },
    /// A git working tree compared against a base revision
    Git { repo: String, base: String },
}

impl DiffSource {
    pub fn load(&self) -> Result<WorktreeDiff> {
        match self {
            DiffSource::Json(path) => load_worktree_diff(path),
            DiffSource::Texts { old, new } => {
                let old_text = read_lossy(old)?;
                let new_text = read_lossy(new)?;
                Ok(WorktreeDiff {
                    files: vec![FileDiff {
                        path: new.to_string_lossy().to_string(),
                        chunks: diff_texts(&old_text, &new_text),
                    }],
                })
            }
            DiffSource::Git { repo, base } => git::worktree_diff(repo, base),
        }
    }

    /// Short description for the top bar
    pub fn label(&self) -> String {
        match self {
            DiffSource::Json(path) => path.display().to_string(),
            DiffSource::Texts { old, new } => format!("{} → {}", old.display(), new.display()),
            DiffSource::Git { repo, base } => {
                let name = Path::new(repo)
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| repo.clone());
                format!("{} vs {}", name, base)
            }
        }
    }

    /// Paths whose changes should trigger a refresh
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        match self {
            DiffSource::Json(path) => vec![path.clone()],
            DiffSource::Texts { old, new } => vec![old.clone(), new.clone()],
            DiffSource::Git { repo, .. } => vec![PathBuf::from(repo)],
        }
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffChunkType;

    #[test]
    fn texts_source_diffs_two_files() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        std::fs::write(&old, "a\nb\n").unwrap();
        std::fs::write(&new, "a\nc\n").unwrap();

        let source = DiffSource::Texts { old: old.clone(), new: new.clone() };
        let diff = source.load().unwrap();
        assert_eq!(diff.files.len(), 1);
        assert_eq!(diff.files[0].path, new.to_string_lossy());
        let kinds: Vec<DiffChunkType> = diff.files[0].chunks.iter().map(|c| c.chunk_type).collect();
        assert_eq!(
            kinds,
            vec![DiffChunkType::Equal, DiffChunkType::Delete, DiffChunkType::Insert]
        );
        assert_eq!(source.watch_paths(), vec![old, new]);
    }

    #[test]
    fn missing_text_file_is_an_error() {
        let source = DiffSource::Texts {
            old: PathBuf::from("/definitely/not/here.txt"),
            new: PathBuf::from("/definitely/not/there.txt"),
        };
        let err = source.load().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read"));
    }

    #[test]
    fn labels() {
        let git = DiffSource::Git { repo: "/work/project".into(), base: "main".into() };
        assert_eq!(git.label(), "project vs main");
        let json = DiffSource::Json(PathBuf::from("diff.json"));
        assert_eq!(json.label(), "diff.json");
    }
}
