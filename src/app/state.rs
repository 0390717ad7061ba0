use anyhow::Result;

use super::filter::{apply_filter, parse_filter_expr, FilterRule};
use super::source::DiffSource;
use crate::config::FoldConfig;
use crate::diff::{
    flatten, fold_keys, sectionize, ChangeKind, ExpandKey, ExpandedSet, ProcessedLine, Section,
    SectionOptions, WorktreeDiff,
};

/// Rows above the first section: file header and a blank line
pub const HEADER_ROWS: usize = 2;

/// Ticks (~100ms each) a notification stays on screen
const NOTIFY_TICKS: u8 = 25;

/// One file of the diff, flattened once per load
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub path: String,
    pub kind: ChangeKind,
    pub adds: usize,
    pub dels: usize,
    pub lines: Vec<ProcessedLine>,
}

pub struct App {
    pub source: DiffSource,
    pub config: FoldConfig,
    pub options: SectionOptions,
    pub files: Vec<FileEntry>,
    /// Open folds. Replaced wholesale on every toggle.
    pub expanded: ExpandedSet,
    pub selected_file: usize,
    pub scroll: usize,
    pub focused_fold: Option<ExpandKey>,
    pub filter_expr: String,
    filter_rules: Vec<FilterRule>,
    /// Filter text being typed; `Some` while the prompt is open
    pub filter_input: Option<String>,
    pub watching: bool,
    pub notification: Option<(String, u8)>,
    pub should_quit: bool,
}

impl App {
    /// Load the source and build the initial view
    pub fn new(source: DiffSource, config: FoldConfig, options: SectionOptions) -> Result<Self> {
        let diff = source.load()?;
        Ok(Self::from_diff(source, diff, config, options))
    }

    pub fn from_diff(
        source: DiffSource,
        diff: WorktreeDiff,
        config: FoldConfig,
        options: SectionOptions,
    ) -> Self {
        let mut app = Self {
            source,
            config,
            options,
            files: Vec::new(),
            expanded: ExpandedSet::default(),
            selected_file: 0,
            scroll: 0,
            focused_fold: None,
            filter_expr: String::new(),
            filter_rules: Vec::new(),
            filter_input: None,
            watching: false,
            notification: None,
            should_quit: false,
        };
        app.set_diff(diff);
        app
    }

    /// Reload from the source, keeping selection and open folds where the file is unchanged
    pub fn refresh(&mut self) -> Result<()> {
        let diff = self.source.load()?;
        self.set_diff(diff);
        Ok(())
    }

    fn set_diff(&mut self, diff: WorktreeDiff) {
        let entries: Vec<FileEntry> = diff
            .files
            .iter()
            .map(|file| {
                let (adds, dels) = file.stats();
                FileEntry {
                    path: file.path.clone(),
                    kind: file.change_kind(),
                    adds,
                    dels,
                    lines: flatten(&file.chunks),
                }
            })
            .collect();

        // Fold keys are positional, so they only survive when the file
        // sits at the same index with identical lines
        let unchanged = |idx: usize| match (self.files.get(idx), entries.get(idx)) {
            (Some(old), Some(new)) => old.path == new.path && old.lines == new.lines,
            _ => false,
        };
        let mut expanded = self.expanded.clone();
        for idx in 0..self.files.len() {
            if !unchanged(idx) {
                expanded = expanded.without_file(idx);
            }
        }
        if let Some(key) = self.focused_fold {
            if !unchanged(key.file_index) {
                self.focused_fold = None;
            }
        }

        let selected_path = self.files.get(self.selected_file).map(|f| f.path.clone());
        let keep_scroll = unchanged(self.selected_file);

        log::debug!(
            "diff loaded: {} files, {} folds kept open",
            entries.len(),
            expanded.len()
        );
        self.files = entries;
        self.expanded = expanded;
        self.selected_file = selected_path
            .and_then(|p| self.files.iter().position(|f| f.path == p))
            .unwrap_or(0);
        if !keep_scroll {
            self.scroll = 0;
        }
        self.ensure_visible_selection();
        self.clamp_scroll();
    }

    // ── Queries ──

    /// Indices of files that pass the current filter
    pub fn visible_files(&self) -> Vec<usize> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, f)| apply_filter(&self.filter_rules, f))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        if self.visible_files().contains(&self.selected_file) {
            self.files.get(self.selected_file)
        } else {
            None
        }
    }

    /// Sections of one file under the current expansion state
    pub fn sections_for(&self, file_index: usize) -> Vec<Section<'_>> {
        match self.files.get(file_index) {
            Some(file) => sectionize(&file.lines, file_index, &self.expanded, &self.options),
            None => Vec::new(),
        }
    }

    pub fn fold_keys_for(&self, file_index: usize) -> Vec<ExpandKey> {
        match self.files.get(file_index) {
            Some(file) => fold_keys(&file.lines, file_index, &self.options),
            None => Vec::new(),
        }
    }

    /// Total rows the selected file takes in the diff view
    pub fn total_rows(&self) -> usize {
        HEADER_ROWS
            + self
                .sections_for(self.selected_file)
                .iter()
                .map(|s| s.display_rows())
                .sum::<usize>()
    }

    /// Row of the placeholder or marker for `key` in the selected file
    pub fn fold_row(&self, key: ExpandKey) -> Option<usize> {
        let mut row = HEADER_ROWS;
        for section in self.sections_for(key.file_index) {
            if section.expand_key() == Some(key) {
                return Some(row);
            }
            row += section.display_rows();
        }
        None
    }

    // ── Navigation ──

    pub fn select_next_file(&mut self) {
        let visible = self.visible_files();
        if let Some(pos) = visible.iter().position(|&i| i == self.selected_file) {
            if pos + 1 < visible.len() {
                self.select_file(visible[pos + 1]);
            }
        } else if let Some(&first) = visible.first() {
            self.select_file(first);
        }
    }

    pub fn select_prev_file(&mut self) {
        let visible = self.visible_files();
        if let Some(pos) = visible.iter().position(|&i| i == self.selected_file) {
            if pos > 0 {
                self.select_file(visible[pos - 1]);
            }
        } else if let Some(&first) = visible.first() {
            self.select_file(first);
        }
    }

    fn select_file(&mut self, idx: usize) {
        self.selected_file = idx;
        self.scroll = 0;
        self.focused_fold = None;
    }

    pub fn scroll_down(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_add(n);
        self.clamp_scroll();
    }

    pub fn scroll_up(&mut self, n: usize) {
        self.scroll = self.scroll.saturating_sub(n);
    }

    fn clamp_scroll(&mut self) {
        let max = self.total_rows().saturating_sub(1);
        self.scroll = self.scroll.min(max);
    }

    /// Focus the next fold of the selected file, wrapping around
    pub fn next_fold(&mut self) {
        if self.selection_hidden() {
            return;
        }
        let keys = self.fold_keys_for(self.selected_file);
        let next = match self.focused_fold {
            Some(current) => keys
                .iter()
                .find(|k| k.start_index > current.start_index)
                .or_else(|| keys.first()),
            None => keys.first(),
        };
        self.focus_fold(next.copied());
    }

    /// Focus the previous fold of the selected file, wrapping around
    pub fn prev_fold(&mut self) {
        if self.selection_hidden() {
            return;
        }
        let keys = self.fold_keys_for(self.selected_file);
        let prev = match self.focused_fold {
            Some(current) => keys
                .iter()
                .rev()
                .find(|k| k.start_index < current.start_index)
                .or_else(|| keys.last()),
            None => keys.last(),
        };
        self.focus_fold(prev.copied());
    }

    fn focus_fold(&mut self, key: Option<ExpandKey>) {
        match key {
            Some(key) => {
                self.focused_fold = Some(key);
                if let Some(row) = self.fold_row(key) {
                    self.scroll = row.saturating_sub(HEADER_ROWS + 1);
                }
            }
            None => self.notify("No folded context in this file"),
        }
    }

    // ── Folding ──

    /// Fold commands only act on a file that is on screen
    fn selection_hidden(&mut self) -> bool {
        if self.selected_entry().is_some() {
            return false;
        }
        self.notify("No file selected");
        true
    }

    /// Open or close the focused fold. Without a focus, the first fold is used.
    pub fn toggle_focused_fold(&mut self) {
        if self.selection_hidden() {
            return;
        }
        if self.focused_fold.is_none() {
            self.next_fold();
        }
        let Some(key) = self.focused_fold else { return };

        self.expanded = self.expanded.toggled(key);
        if self.expanded.contains(&key) {
            self.notify(&format!("Expanded {} lines", key.len()));
        } else {
            self.notify(&format!("Collapsed {} lines", key.len()));
            // Keep the placeholder on screen after closing a long fold
            if let Some(row) = self.fold_row(key) {
                if row < self.scroll {
                    self.scroll = row.saturating_sub(HEADER_ROWS + 1);
                }
            }
        }
        self.clamp_scroll();
    }

    pub fn expand_all_in_file(&mut self) {
        if self.selection_hidden() {
            return;
        }
        let keys = self.fold_keys_for(self.selected_file);
        if keys.is_empty() {
            self.notify("No folded context in this file");
            return;
        }
        let count = keys.len();
        self.expanded = self.expanded.with_all(keys);
        self.notify(&format!("Expanded {} folds", count));
    }

    pub fn collapse_all_in_file(&mut self) {
        if self.selection_hidden() {
            return;
        }
        self.expanded = self.expanded.without_file(self.selected_file);
        self.clamp_scroll();
        self.notify("Collapsed all folds");
    }

    // ── Filter ──

    pub fn apply_filter_expr(&mut self, expr: &str) {
        self.filter_expr = expr.trim().to_string();
        self.filter_rules = parse_filter_expr(&self.filter_expr);
        self.ensure_visible_selection();
    }

    /// Open the filter prompt, seeded with the current expression
    pub fn begin_filter_input(&mut self) {
        self.filter_input = Some(self.filter_expr.clone());
    }

    pub fn push_filter_char(&mut self, c: char) {
        if let Some(input) = &mut self.filter_input {
            input.push(c);
        }
    }

    pub fn pop_filter_char(&mut self) {
        if let Some(input) = &mut self.filter_input {
            input.pop();
        }
    }

    pub fn commit_filter_input(&mut self) {
        if let Some(input) = self.filter_input.take() {
            self.apply_filter_expr(&input);
            let shown = self.visible_files().len();
            self.notify(&format!("{} of {} files shown", shown, self.files.len()));
        }
    }

    pub fn cancel_filter_input(&mut self) {
        self.filter_input = None;
    }

    fn ensure_visible_selection(&mut self) {
        let visible = self.visible_files();
        if !visible.contains(&self.selected_file) {
            if let Some(&first) = visible.first() {
                self.select_file(first);
            }
        }
    }

    // ── Notifications ──

    pub fn notify(&mut self, msg: &str) {
        self.notification = Some((msg.to_string(), NOTIFY_TICKS));
    }

    /// Advance one tick; clears notifications when they expire
    pub fn tick(&mut self) {
        if let Some((_, ticks)) = &mut self.notification {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                self.notification = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffChunk, DiffChunkType, FileDiff, SectionKind};
    use std::path::PathBuf;

    fn numbered(prefix: &str, n: usize) -> String {
        (1..=n).map(|i| format!("{} {}\n", prefix, i)).collect()
    }

    /// Change, 20 context lines, change: one fold at 4..18 with radius 3
    fn file(path: &str) -> FileDiff {
        FileDiff {
            path: path.to_string(),
            chunks: vec![
                DiffChunk::new(DiffChunkType::Insert, "added\n"),
                DiffChunk::new(DiffChunkType::Equal, numbered("same", 20)),
                DiffChunk::new(DiffChunkType::Delete, "removed\n"),
            ],
        }
    }

    fn app_with(files: Vec<FileDiff>) -> App {
        App::from_diff(
            DiffSource::Json(PathBuf::from("test.json")),
            WorktreeDiff { files },
            FoldConfig::default(),
            SectionOptions::default(),
        )
    }

    #[test]
    fn entries_are_flattened_with_stats() {
        let app = app_with(vec![file("a.rs")]);
        assert_eq!(app.files.len(), 1);
        assert_eq!(app.files[0].lines.len(), 22);
        assert_eq!((app.files[0].adds, app.files[0].dels), (1, 1));
        assert_eq!(app.files[0].kind, ChangeKind::Modified);
    }

    #[test]
    fn toggle_focused_fold_expands_then_collapses() {
        let mut app = app_with(vec![file("a.rs")]);
        let collapsed = app.sections_for(0).len();

        app.toggle_focused_fold();
        let key = app.focused_fold.unwrap();
        assert_eq!((key.start_index, key.end_index), (4, 18));
        assert!(app.expanded.contains(&key));
        assert!(app.sections_for(0).iter().any(|s| s.kind() == SectionKind::Expanded));

        app.toggle_focused_fold();
        assert!(app.expanded.is_empty());
        assert_eq!(app.sections_for(0).len(), collapsed);
    }

    #[test]
    fn fold_navigation_wraps() {
        let mut f = file("a.rs");
        f.chunks.push(DiffChunk::new(DiffChunkType::Equal, numbered("tail", 20)));
        f.chunks.push(DiffChunk::new(DiffChunkType::Insert, "end\n"));
        let mut app = app_with(vec![f]);
        let keys = app.fold_keys_for(0);
        assert_eq!(keys.len(), 2);

        app.next_fold();
        assert_eq!(app.focused_fold, Some(keys[0]));
        app.next_fold();
        assert_eq!(app.focused_fold, Some(keys[1]));
        app.next_fold();
        assert_eq!(app.focused_fold, Some(keys[0]));
        app.prev_fold();
        assert_eq!(app.focused_fold, Some(keys[1]));
    }

    #[test]
    fn no_folds_notifies() {
        let mut app = app_with(vec![FileDiff {
            path: "small.rs".into(),
            chunks: vec![DiffChunk::new(DiffChunkType::Insert, "x\n")],
        }]);
        app.toggle_focused_fold();
        assert!(app.focused_fold.is_none());
        assert!(app.expanded.is_empty());
        assert!(app.notification.is_some());
    }

    #[test]
    fn expand_and_collapse_all_only_touch_selected_file() {
        let mut app = app_with(vec![file("a.rs"), file("b.rs")]);
        app.select_next_file();
        app.expand_all_in_file();
        assert_eq!(app.expanded.count_in_file(1), 1);
        assert_eq!(app.expanded.count_in_file(0), 0);

        app.select_prev_file();
        app.expand_all_in_file();
        app.collapse_all_in_file();
        assert_eq!(app.expanded.count_in_file(0), 0);
        assert_eq!(app.expanded.count_in_file(1), 1);
    }

    #[test]
    fn fold_rows_account_for_header_and_sections() {
        let app = app_with(vec![file("a.rs")]);
        let key = app.fold_keys_for(0)[0];
        // header (2) + change (1) + context (3)
        assert_eq!(app.fold_row(key), Some(6));
        // header + change + ctx + placeholder + ctx + change
        assert_eq!(app.total_rows(), 2 + 1 + 3 + 1 + 3 + 1);
    }

    #[test]
    fn refresh_keeps_folds_of_unchanged_files_only() {
        let mut app = app_with(vec![file("a.rs"), file("b.rs")]);
        let all: Vec<ExpandKey> = app.fold_keys_for(0).into_iter().chain(app.fold_keys_for(1)).collect();
        app.expanded = app.expanded.with_all(all);

        let mut changed_b = file("b.rs");
        changed_b.chunks.insert(0, DiffChunk::new(DiffChunkType::Insert, "new first line\n"));
        app.set_diff(WorktreeDiff { files: vec![file("a.rs"), changed_b] });

        assert_eq!(app.expanded.count_in_file(0), 1);
        assert_eq!(app.expanded.count_in_file(1), 0);
    }

    #[test]
    fn refresh_keeps_selection_by_path() {
        let mut app = app_with(vec![file("a.rs"), file("b.rs")]);
        app.select_next_file();
        app.set_diff(WorktreeDiff { files: vec![file("new.rs"), file("a.rs"), file("b.rs")] });
        assert_eq!(app.files[app.selected_file].path, "b.rs");
    }

    #[test]
    fn filter_moves_selection_to_visible_file() {
        let mut app = app_with(vec![file("a.rs"), file("b.toml")]);
        app.apply_filter_expr("*.toml");
        assert_eq!(app.visible_files(), vec![1]);
        assert_eq!(app.selected_entry().map(|f| f.path.as_str()), Some("b.toml"));

        app.apply_filter_expr("*.md");
        assert!(app.selected_entry().is_none());
    }

    #[test]
    fn filter_prompt_applies_on_commit_only() {
        let mut app = app_with(vec![file("a.rs"), file("b.toml")]);
        app.begin_filter_input();
        for c in "*.tomlx".chars() {
            app.push_filter_char(c);
        }
        app.pop_filter_char();
        assert_eq!(app.visible_files(), vec![0, 1]);

        app.commit_filter_input();
        assert!(app.filter_input.is_none());
        assert_eq!(app.filter_expr, "*.toml");
        assert_eq!(app.visible_files(), vec![1]);

        app.begin_filter_input();
        app.push_filter_char('!');
        app.cancel_filter_input();
        assert_eq!(app.filter_expr, "*.toml");
    }

    #[test]
    fn fold_commands_ignore_a_filtered_out_file() {
        let mut app = app_with(vec![file("a.rs")]);
        app.apply_filter_expr("*.md");
        assert!(app.selected_entry().is_none());

        app.toggle_focused_fold();
        app.expand_all_in_file();
        app.next_fold();
        assert!(app.expanded.is_empty());
        assert!(app.focused_fold.is_none());
        assert_eq!(app.notification.as_ref().map(|(m, _)| m.as_str()), Some("No file selected"));

        app.apply_filter_expr("");
        app.expand_all_in_file();
        assert_eq!(app.expanded.count_in_file(0), 1);
        app.apply_filter_expr("*.md");
        app.collapse_all_in_file();
        assert_eq!(app.expanded.count_in_file(0), 1);
    }

    #[test]
    fn scroll_is_clamped_to_content() {
        let mut app = app_with(vec![file("a.rs")]);
        app.scroll_down(1000);
        assert_eq!(app.scroll, app.total_rows() - 1);
        app.scroll_up(1000);
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn notifications_expire() {
        let mut app = app_with(vec![]);
        app.notify("hello");
        for _ in 0..NOTIFY_TICKS {
            assert!(app.notification.is_some());
            app.tick();
        }
        assert!(app.notification.is_none());
    }
}
