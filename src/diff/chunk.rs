use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::borrow::Cow;
use std::path::Path;

/// Kind of a homogeneous edit run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffChunkType {
    Equal,
    Insert,
    Delete,
}

impl DiffChunkType {
    pub fn prefix(&self) -> char {
        match self {
            DiffChunkType::Equal => ' ',
            DiffChunkType::Insert => '+',
            DiffChunkType::Delete => '-',
        }
    }
}

/// One run of same-kind lines, joined with '\n'
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    pub chunk_type: DiffChunkType,
    pub content: String,
}

impl DiffChunk {
    pub fn new(chunk_type: DiffChunkType, content: impl Into<String>) -> Self {
        Self {
            chunk_type,
            content: content.into(),
        }
    }
}

/// Overall shape of a file's change, derived from its chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeKind::Added => "+",
            ChangeKind::Modified => "~",
            ChangeKind::Deleted => "-",
        }
    }
}

/// All chunks for a single file, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    pub path: String,
    pub chunks: Vec<DiffChunk>,
}

impl FileDiff {
    /// Count (inserted, deleted) lines across all chunks
    pub fn stats(&self) -> (usize, usize) {
        let mut adds = 0;
        let mut dels = 0;
        for chunk in &self.chunks {
            let n = count_lines(&chunk.content);
            match chunk.chunk_type {
                DiffChunkType::Insert => adds += n,
                DiffChunkType::Delete => dels += n,
                DiffChunkType::Equal => {}
            }
        }
        (adds, dels)
    }

    /// Added when there is nothing but inserted content, Deleted when there is
    /// nothing but deleted content, Modified otherwise
    pub fn change_kind(&self) -> ChangeKind {
        let has = |t: DiffChunkType| {
            self.chunks
                .iter()
                .any(|c| c.chunk_type == t && !c.content.is_empty())
        };
        let (equal, insert, delete) = (
            has(DiffChunkType::Equal),
            has(DiffChunkType::Insert),
            has(DiffChunkType::Delete),
        );
        match (equal, insert, delete) {
            (false, true, false) => ChangeKind::Added,
            (false, false, true) => ChangeKind::Deleted,
            _ => ChangeKind::Modified,
        }
    }
}

/// A whole diff: one entry per changed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorktreeDiff {
    pub files: Vec<FileDiff>,
}

/// Number of physical lines in chunk content (a trailing newline does not start a new line)
fn count_lines(content: &str) -> usize {
    if content.is_empty() {
        return 0;
    }
    let n = content.split('\n').count();
    if content.ends_with('\n') {
        n - 1
    } else {
        n
    }
}

/// Load a diff in the backend's JSON chunk format
pub fn load_worktree_diff(path: &Path) -> Result<WorktreeDiff> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read diff file '{}'", path.display()))?;
    parse_worktree_diff(&raw).with_context(|| format!("Invalid diff file '{}'", path.display()))
}

/// Parse a diff in the backend's JSON chunk format.
/// Accepts either `{"files": [...]}` or a bare array of files.
pub fn parse_worktree_diff(raw: &str) -> Result<WorktreeDiff> {
    let value: serde_json::Value = serde_json::from_str(raw).context("Malformed JSON")?;
    let diff = if value.is_array() {
        WorktreeDiff {
            files: serde_json::from_value(value).context("Unexpected file list shape")?,
        }
    } else {
        serde_json::from_value(value).context("Unexpected diff shape")?
    };
    log::debug!("parsed diff with {} files", diff.files.len());
    Ok(diff)
}

/// Line-based diff of two texts, grouping contiguous same-kind lines into one chunk.
/// A modified line comes out as Delete followed by Insert. A missing final
/// newline is not a change: both sides are compared as terminated lines.
pub fn diff_texts(old: &str, new: &str) -> Vec<DiffChunk> {
    let old = terminated(old);
    let new = terminated(new);
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());
    let mut chunks: Vec<DiffChunk> = Vec::new();

    for change in diff.iter_all_changes() {
        let chunk_type = match change.tag() {
            ChangeTag::Equal => DiffChunkType::Equal,
            ChangeTag::Insert => DiffChunkType::Insert,
            ChangeTag::Delete => DiffChunkType::Delete,
        };
        let text = change.value();

        match chunks.last_mut() {
            Some(last) if last.chunk_type == chunk_type => last.content.push_str(text),
            _ => chunks.push(DiffChunk::new(chunk_type, text)),
        }
    }

    chunks
}

fn terminated(text: &str) -> Cow<'_, str> {
    if text.is_empty() || text.ends_with('\n') {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(format!("{}\n", text))
    }
}
