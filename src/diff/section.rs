use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

use super::expand::ExpandedSet;
use super::lines::ProcessedLine;

pub const DEFAULT_CONTEXT_RADIUS: usize = 3;

/// Identifies one foldable run of context lines.
///
/// Indices point into the file's flattened line list; `end_index` is exclusive.
/// Keys stay stable across re-renders as long as the file's chunks keep their shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExpandKey {
    pub file_index: usize,
    pub start_index: usize,
    pub end_index: usize,
}

impl ExpandKey {
    pub fn new(file_index: usize, range: Range<usize>) -> Self {
        Self {
            file_index,
            start_index: range.start,
            end_index: range.end,
        }
    }

    /// Number of lines hidden behind this key
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn range(&self) -> Range<usize> {
        self.start_index..self.end_index
    }
}

impl fmt::Display for ExpandKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.file_index, self.start_index, self.end_index)
    }
}

/// What to do with context at the very start or end of a file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EdgeContext {
    /// Show leading/trailing context in full
    #[default]
    Full,
    /// Keep `context_radius` lines next to the change and fold the rest
    Collapse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOptions {
    pub context_radius: usize,
    pub edge_context: EdgeContext,
}

impl Default for SectionOptions {
    fn default() -> Self {
        Self {
            context_radius: DEFAULT_CONTEXT_RADIUS,
            edge_context: EdgeContext::Full,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Context,
    Change,
    Expanded,
}

/// A renderable piece of a file diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Section<'a> {
    /// Unchanged lines shown as-is
    Context(&'a [ProcessedLine]),
    /// Placeholder for hidden context lines
    Collapsed(ExpandKey),
    /// Inserted and/or deleted lines
    Change(&'a [ProcessedLine]),
    /// A fold the user opened
    Expanded(ExpandKey, &'a [ProcessedLine]),
}

impl<'a> Section<'a> {
    pub fn kind(&self) -> SectionKind {
        match self {
            Section::Context(_) | Section::Collapsed(_) => SectionKind::Context,
            Section::Change(_) => SectionKind::Change,
            Section::Expanded(..) => SectionKind::Expanded,
        }
    }

    /// Visible lines (empty for a collapsed placeholder)
    pub fn lines(&self) -> &'a [ProcessedLine] {
        match self {
            Section::Context(lines) | Section::Change(lines) | Section::Expanded(_, lines) => *lines,
            Section::Collapsed(_) => &[],
        }
    }

    pub fn expand_key(&self) -> Option<ExpandKey> {
        match self {
            Section::Collapsed(key) | Section::Expanded(key, _) => Some(*key),
            _ => None,
        }
    }

    /// Rows this section takes on screen. Placeholders and the marker above
    /// an expanded fold take one row each.
    pub fn display_rows(&self) -> usize {
        match self {
            Section::Context(lines) | Section::Change(lines) => lines.len(),
            Section::Collapsed(_) => 1,
            Section::Expanded(_, lines) => 1 + lines.len(),
        }
    }
}

/// Layout of a file independent of which folds are open
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Context(Range<usize>),
    Change(Range<usize>),
    Fold(Range<usize>),
}

/// Split lines into maximal runs of context (false) or change (true)
fn runs(lines: &[ProcessedLine]) -> Vec<(Range<usize>, bool)> {
    let mut runs: Vec<(Range<usize>, bool)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let is_change = line.is_change();
        match runs.last_mut() {
            Some((range, kind)) if *kind == is_change => range.end = idx + 1,
            _ => runs.push((idx..idx + 1, is_change)),
        }
    }
    runs
}

fn push_context(pieces: &mut Vec<Piece>, range: Range<usize>) {
    if !range.is_empty() {
        pieces.push(Piece::Context(range));
    }
}

fn push_fold(pieces: &mut Vec<Piece>, range: Range<usize>) {
    if !range.is_empty() {
        pieces.push(Piece::Fold(range));
    }
}

fn plan(lines: &[ProcessedLine], options: &SectionOptions) -> Vec<Piece> {
    let radius = options.context_radius;
    let collapse_edges = options.edge_context == EdgeContext::Collapse;
    let runs = runs(lines);
    let mut pieces = Vec::with_capacity(runs.len() * 2);

    for (idx, (range, is_change)) in runs.iter().enumerate() {
        if *is_change {
            pieces.push(Piece::Change(range.clone()));
            continue;
        }

        // Runs alternate, so any neighbour of a context run is a change
        let change_before = idx > 0;
        let change_after = idx + 1 < runs.len();
        let (start, end) = (range.start, range.end);
        let len = end - start;

        match (change_before, change_after) {
            (true, true) if len > radius * 2 => {
                push_context(&mut pieces, start..start + radius);
                push_fold(&mut pieces, start + radius..end - radius);
                push_context(&mut pieces, end - radius..end);
            }
            (true, false) if collapse_edges && len > radius => {
                push_context(&mut pieces, start..start + radius);
                push_fold(&mut pieces, start + radius..end);
            }
            (false, true) if collapse_edges && len > radius => {
                push_fold(&mut pieces, start..end - radius);
                push_context(&mut pieces, end - radius..end);
            }
            _ => push_context(&mut pieces, range.clone()),
        }
    }

    pieces
}

/// Turn a file's flattened lines into renderable sections.
///
/// Change runs are never folded. Context between two changes longer than
/// twice the radius keeps `context_radius` lines on each side and folds the
/// middle; the fold is emitted expanded when its key is in `expanded`.
pub fn sectionize<'a>(
    lines: &'a [ProcessedLine],
    file_index: usize,
    expanded: &ExpandedSet,
    options: &SectionOptions,
) -> Vec<Section<'a>> {
    plan(lines, options)
        .into_iter()
        .map(|piece| match piece {
            Piece::Context(range) => Section::Context(&lines[range]),
            Piece::Change(range) => Section::Change(&lines[range]),
            Piece::Fold(range) => {
                let key = ExpandKey::new(file_index, range);
                if expanded.contains(&key) {
                    Section::Expanded(key, &lines[key.range()])
                } else {
                    Section::Collapsed(key)
                }
            }
        })
        .collect()
}

/// Every fold key the file can produce, in document order
pub fn fold_keys(
    lines: &[ProcessedLine],
    file_index: usize,
    options: &SectionOptions,
) -> Vec<ExpandKey> {
    plan(lines, options)
        .into_iter()
        .filter_map(|piece| match piece {
            Piece::Fold(range) => Some(ExpandKey::new(file_index, range)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::chunk::{DiffChunk, DiffChunkType};
    use crate::diff::lines::flatten;

    use DiffChunkType::{Delete, Equal, Insert};

    /// Build chunks of `n` numbered lines each
    fn chunks(runs: &[(DiffChunkType, usize)]) -> Vec<DiffChunk> {
        let mut counter = 0;
        runs.iter()
            .map(|(t, n)| {
                let mut content = String::new();
                for _ in 0..*n {
                    counter += 1;
                    content.push_str(&format!("line {}\n", counter));
                }
                DiffChunk::new(*t, content)
            })
            .collect()
    }

    /// Compact description like ["ctx 3", "chg 2", "fold 4..9"]
    fn shape(sections: &[Section]) -> Vec<String> {
        sections
            .iter()
            .map(|s| match s {
                Section::Context(l) => format!("ctx {}", l.len()),
                Section::Change(l) => format!("chg {}", l.len()),
                Section::Collapsed(k) => format!("fold {}..{}", k.start_index, k.end_index),
                Section::Expanded(k, _) => format!("open {}..{}", k.start_index, k.end_index),
            })
            .collect()
    }

    fn opts(radius: usize, edge: EdgeContext) -> SectionOptions {
        SectionOptions {
            context_radius: radius,
            edge_context: edge,
        }
    }

    fn expand_everything(lines: &[ProcessedLine], options: &SectionOptions) -> ExpandedSet {
        ExpandedSet::default().with_all(fold_keys(lines, 0, options))
    }

    #[test]
    fn empty_input_yields_no_sections() {
        let lines = flatten(&[]);
        assert!(sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default()).is_empty());
    }

    #[test]
    fn worked_example_with_full_edges() {
        let lines = flatten(&chunks(&[(Equal, 10), (Delete, 2), (Equal, 10)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &opts(3, EdgeContext::Full));
        assert_eq!(shape(&sections), vec!["ctx 10", "chg 2", "ctx 10"]);
    }

    #[test]
    fn worked_example_with_collapsed_edges() {
        let lines = flatten(&chunks(&[(Equal, 10), (Delete, 2), (Equal, 10)]));
        let sections =
            sectionize(&lines, 0, &ExpandedSet::default(), &opts(3, EdgeContext::Collapse));
        assert_eq!(
            shape(&sections),
            vec!["fold 0..7", "ctx 3", "chg 2", "ctx 3", "fold 15..22"]
        );
    }

    #[test]
    fn interior_context_is_folded_around_radius() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 10), (Delete, 1)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        assert_eq!(shape(&sections), vec!["chg 1", "ctx 3", "fold 4..8", "ctx 3", "chg 1"]);
        assert_eq!(sections[2].expand_key().map(|k| k.len()), Some(4));
        assert!(sections[2].lines().is_empty());
        assert_eq!(sections[2].kind(), SectionKind::Context);
    }

    #[test]
    fn short_interior_context_is_not_split() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 6), (Delete, 1)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        assert_eq!(shape(&sections), vec!["chg 1", "ctx 6", "chg 1"]);
    }

    #[test]
    fn one_line_over_threshold_folds_a_single_line() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 7), (Delete, 1)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        assert_eq!(shape(&sections), vec!["chg 1", "ctx 3", "fold 4..5", "ctx 3", "chg 1"]);
    }

    #[test]
    fn file_without_changes_is_never_folded() {
        let lines = flatten(&chunks(&[(Equal, 50)]));
        for edge in [EdgeContext::Full, EdgeContext::Collapse] {
            let sections = sectionize(&lines, 0, &ExpandedSet::default(), &opts(3, edge));
            assert_eq!(shape(&sections), vec!["ctx 50"]);
        }
    }

    #[test]
    fn short_edge_runs_stay_whole_when_collapsing_edges() {
        let lines = flatten(&chunks(&[(Equal, 3), (Insert, 1), (Equal, 2)]));
        let sections =
            sectionize(&lines, 0, &ExpandedSet::default(), &opts(3, EdgeContext::Collapse));
        assert_eq!(shape(&sections), vec!["ctx 3", "chg 1", "ctx 2"]);
    }

    #[test]
    fn mixed_insert_delete_is_one_change() {
        let lines = flatten(&chunks(&[(Equal, 1), (Delete, 2), (Insert, 3), (Equal, 1)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        assert_eq!(shape(&sections), vec!["ctx 1", "chg 5", "ctx 1"]);
        assert_eq!(sections[1].kind(), SectionKind::Change);
    }

    #[test]
    fn expanded_key_reveals_lines() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 10), (Delete, 1)]));
        let options = SectionOptions::default();
        let key = fold_keys(&lines, 0, &options)[0];
        let expanded = ExpandedSet::default().toggled(key);
        let sections = sectionize(&lines, 0, &expanded, &options);
        assert_eq!(shape(&sections), vec!["chg 1", "ctx 3", "open 4..8", "ctx 3", "chg 1"]);
        let revealed: Vec<&str> = sections[2].lines().iter().map(|l| l.content.as_str()).collect();
        assert_eq!(revealed, vec!["line 5", "line 6", "line 7", "line 8"]);
        assert_eq!(sections[2].display_rows(), 5);
        assert_eq!(sections[2].kind(), SectionKind::Expanded);
    }

    #[test]
    fn keys_are_namespaced_by_file() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 10), (Delete, 1)]));
        let options = SectionOptions::default();
        let other_file_key = fold_keys(&lines, 1, &options)[0];
        let expanded = ExpandedSet::default().toggled(other_file_key);

        let file0 = sectionize(&lines, 0, &expanded, &options);
        assert!(matches!(file0[2], Section::Collapsed(_)));
        let file1 = sectionize(&lines, 1, &expanded, &options);
        assert!(matches!(file1[2], Section::Expanded(..)));
        assert_eq!(other_file_key.to_string(), "1-4-8");
    }

    #[test]
    fn toggling_twice_restores_collapsed_form() {
        let lines = flatten(&chunks(&[(Equal, 2), (Insert, 1), (Equal, 12), (Delete, 1)]));
        let options = SectionOptions::default();
        let before = sectionize(&lines, 0, &ExpandedSet::default(), &options);
        let key = before.iter().find_map(|s| s.expand_key()).unwrap();

        let open = ExpandedSet::default().toggled(key);
        assert_ne!(sectionize(&lines, 0, &open, &options), before);
        let closed = open.toggled(key);
        assert_eq!(sectionize(&lines, 0, &closed, &options), before);
    }

    #[test]
    fn zero_radius_folds_entire_interior() {
        let lines = flatten(&chunks(&[(Insert, 1), (Equal, 4), (Delete, 1)]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &opts(0, EdgeContext::Full));
        assert_eq!(shape(&sections), vec!["chg 1", "fold 1..5", "chg 1"]);
    }

    #[test]
    fn fully_expanded_sections_reconstruct_lines() {
        let cases: Vec<Vec<(DiffChunkType, usize)>> = vec![
            vec![(Equal, 10), (Delete, 2), (Equal, 10)],
            vec![(Insert, 4)],
            vec![(Equal, 1), (Delete, 1), (Insert, 1), (Equal, 20), (Insert, 2), (Equal, 7)],
            vec![(Delete, 3), (Equal, 8), (Insert, 1), (Equal, 6), (Delete, 2), (Equal, 30)],
        ];
        for case in cases {
            let lines = flatten(&chunks(&case));
            for options in [
                opts(3, EdgeContext::Full),
                opts(3, EdgeContext::Collapse),
                opts(1, EdgeContext::Collapse),
                opts(0, EdgeContext::Full),
            ] {
                let expanded = expand_everything(&lines, &options);
                let sections = sectionize(&lines, 0, &expanded, &options);
                let rebuilt: Vec<ProcessedLine> = sections
                    .iter()
                    .flat_map(|s| s.lines().iter().cloned())
                    .collect();
                assert_eq!(rebuilt, lines, "{:?} {:?}", case, options);
            }
        }
    }

    #[test]
    fn line_numbers_increase_in_document_order() {
        let lines = flatten(&chunks(&[
            (Equal, 5),
            (Delete, 2),
            (Insert, 3),
            (Equal, 9),
            (Insert, 1),
            (Equal, 4),
        ]));
        let options = SectionOptions::default();
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &options);

        let mut last_old = 0;
        let mut last_new = 0;
        for line in sections.iter().flat_map(|s| s.lines()) {
            if let Some(n) = line.old_line_number {
                assert!(n > last_old);
                last_old = n;
            }
            if let Some(n) = line.new_line_number {
                assert!(n > last_new);
                last_new = n;
            }
        }
    }

    #[test]
    fn change_sections_never_touch_without_context_between() {
        let lines = flatten(&chunks(&[
            (Delete, 1),
            (Equal, 20),
            (Insert, 1),
            (Equal, 1),
            (Delete, 1),
        ]));
        let sections = sectionize(&lines, 0, &ExpandedSet::default(), &SectionOptions::default());
        for pair in sections.windows(2) {
            assert!(!(pair[0].kind() == SectionKind::Change && pair[1].kind() == SectionKind::Change));
        }
    }

    #[test]
    fn fold_keys_match_emitted_placeholders() {
        let lines = flatten(&chunks(&[(Equal, 9), (Insert, 1), (Equal, 9), (Delete, 1), (Equal, 9)]));
        let options = opts(2, EdgeContext::Collapse);
        let from_sections: Vec<ExpandKey> =
            sectionize(&lines, 3, &ExpandedSet::default(), &options)
                .iter()
                .filter_map(|s| s.expand_key())
                .collect();
        assert_eq!(fold_keys(&lines, 3, &options), from_sections);
        assert_eq!(from_sections.len(), 3);
    }
}
