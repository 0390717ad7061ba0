use anyhow::Result;
use serde::Serialize;
use std::fmt::Write;

use crate::diff::{ExpandKey, ProcessedLine, Section, SectionKind};

/// Plain-text rendering of one file's sections, unified-diff style.
/// Folded context becomes a single `@@ ⋯ N hidden lines (key) @@` row.
pub fn render_text(path: &str, sections: &[Section<'_>], line_numbers: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {}", path);

    for section in sections {
        match section {
            Section::Context(lines) | Section::Change(lines) => {
                push_lines(&mut out, lines, line_numbers);
            }
            Section::Collapsed(key) => {
                let _ = writeln!(out, "@@ ⋯ {} hidden lines ({}) @@", key.len(), key);
            }
            Section::Expanded(key, lines) => {
                let _ = writeln!(out, "@@ ▾ {} lines expanded ({}) @@", key.len(), key);
                push_lines(&mut out, lines, line_numbers);
            }
        }
    }
    out
}

fn push_lines(out: &mut String, lines: &[ProcessedLine], line_numbers: bool) {
    for line in lines {
        if line_numbers {
            let _ = write!(
                out,
                "{:>4} {:>4} │",
                line.old_line_number.map(|n| n.to_string()).unwrap_or_default(),
                line.new_line_number.map(|n| n.to_string()).unwrap_or_default(),
            );
        }
        let _ = writeln!(out, "{}{}", line.chunk_type.prefix(), line.content);
    }
}

#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub path: &'a str,
    pub sections: Vec<SectionReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct SectionReport<'a> {
    pub kind: SectionKind,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "key_as_string")]
    pub expand_key: Option<ExpandKey>,
    /// Lines behind a collapsed placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<usize>,
    pub lines: &'a [ProcessedLine],
}

fn key_as_string<S: serde::Serializer>(key: &Option<ExpandKey>, s: S) -> Result<S::Ok, S::Error> {
    match key {
        Some(key) => s.collect_str(key),
        None => s.serialize_none(),
    }
}

pub fn file_report<'a>(path: &'a str, sections: &[Section<'a>]) -> FileReport<'a> {
    let sections = sections
        .iter()
        .map(|section| SectionReport {
            kind: section.kind(),
            expand_key: section.expand_key(),
            hidden: match section {
                Section::Collapsed(key) => Some(key.len()),
                _ => None,
            },
            lines: section.lines(),
        })
        .collect();
    FileReport { path, sections }
}

pub fn render_json(reports: &[FileReport<'_>]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{
        flatten, sectionize, DiffChunk, DiffChunkType, EdgeContext, ExpandedSet, SectionOptions,
    };

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line {}\n", i)).collect()
    }

    fn lines() -> Vec<ProcessedLine> {
        flatten(&[
            DiffChunk::new(DiffChunkType::Equal, numbered(10)),
            DiffChunk::new(DiffChunkType::Delete, "gone a\ngone b\n"),
            DiffChunk::new(DiffChunkType::Equal, numbered(10)),
        ])
    }

    fn collapse() -> SectionOptions {
        SectionOptions {
            context_radius: 3,
            edge_context: EdgeContext::Collapse,
        }
    }

    #[test]
    fn text_folds_hidden_context() {
        let lines = lines();
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &collapse());
        let text = render_text("a.txt", &sections, false);
        let rows: Vec<&str> = text.lines().collect();

        assert_eq!(rows[0], "=== a.txt");
        assert_eq!(rows[1], "@@ ⋯ 7 hidden lines (0-0-7) @@");
        assert_eq!(rows[2], " line 8");
        assert_eq!(rows[5], "-gone a");
        assert_eq!(rows.last(), Some(&"@@ ⋯ 7 hidden lines (0-15-22) @@"));
        assert_eq!(rows.len(), 1 + 1 + 3 + 2 + 3 + 1);
    }

    #[test]
    fn text_with_line_numbers() {
        let lines = lines();
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        let text = render_text("a.txt", &sections, true);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows[1], "   1    1 │ line 1");
        assert_eq!(rows[11], "  11      │-gone a");
    }

    #[test]
    fn expanded_fold_has_marker_and_lines() {
        let lines = lines();
        let expanded = ExpandedSet::default().toggled(ExpandKey::new(0, 0..7));
        let sections = sectionize(&lines, 0, &expanded, &collapse());
        let text = render_text("a.txt", &sections, false);
        assert!(text.contains("@@ ▾ 7 lines expanded (0-0-7) @@\n line 1\n"));
    }

    #[test]
    fn json_report_shape() {
        let lines = lines();
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &collapse());
        let json = render_json(&[file_report("a.txt", &sections)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let file = &value[0];
        assert_eq!(file["path"], "a.txt");
        let first = &file["sections"][0];
        assert_eq!(first["kind"], "context");
        assert_eq!(first["expand_key"], "0-0-7");
        assert_eq!(first["hidden"], 7);
        assert_eq!(first["lines"].as_array().map(|a| a.len()), Some(0));

        let change = &file["sections"][2];
        assert_eq!(change["kind"], "change");
        assert!(change.get("expand_key").is_none());
        assert_eq!(change["lines"][0]["content"], "gone a");
        assert_eq!(change["lines"][0]["chunk_type"], "Delete");
        assert_eq!(change["lines"][0]["old_line_number"], 11);
        assert!(change["lines"][0].get("new_line_number").is_none());
    }
}
