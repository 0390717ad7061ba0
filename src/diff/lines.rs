use serde::Serialize;

use super::chunk::{DiffChunk, DiffChunkType};

/// A single physical line of a file diff, with its position in the old and new file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedLine {
    pub content: String,
    pub chunk_type: DiffChunkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_line_number: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_line_number: Option<usize>,
}

impl ProcessedLine {
    pub fn is_change(&self) -> bool {
        self.chunk_type != DiffChunkType::Equal
    }
}

/// Flatten chunks into one entry per line.
///
/// Each chunk is split on '\n'; a single trailing empty piece left by a
/// trailing newline is dropped, interior empty lines are kept. Equal lines
/// advance both line counters, Delete only the old one, Insert only the new one.
pub fn flatten(chunks: &[DiffChunk]) -> Vec<ProcessedLine> {
    let mut lines = Vec::new();
    let mut old_line: usize = 1;
    let mut new_line: usize = 1;

    for chunk in chunks {
        let mut pieces: Vec<&str> = chunk.content.split('\n').collect();
        if pieces.last() == Some(&"") {
            pieces.pop();
        }

        for piece in pieces {
            let (old_num, new_num) = match chunk.chunk_type {
                DiffChunkType::Equal => {
                    let nums = (Some(old_line), Some(new_line));
                    old_line += 1;
                    new_line += 1;
                    nums
                }
                DiffChunkType::Delete => {
                    let nums = (Some(old_line), None);
                    old_line += 1;
                    nums
                }
                DiffChunkType::Insert => {
                    let nums = (None, Some(new_line));
                    new_line += 1;
                    nums
                }
            };
            lines.push(ProcessedLine {
                content: piece.to_string(),
                chunk_type: chunk.chunk_type,
                old_line_number: old_num,
                new_line_number: new_num,
            });
        }
    }

    lines
}
