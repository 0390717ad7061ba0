use glob::{MatchOptions, Pattern};

use super::state::FileEntry;
use crate::diff::ChangeKind;

// ── Types ──

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeOp {
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone)]
pub enum FilterRule {
    Glob { include: bool, pattern: Pattern },
    Kind { include: bool, kind: ChangeKind },
    Size { include: bool, op: SizeOp, threshold: usize },
}

impl FilterRule {
    fn is_include(&self) -> bool {
        match self {
            FilterRule::Glob { include, .. } => *include,
            FilterRule::Kind { include, .. } => *include,
            FilterRule::Size { include, .. } => *include,
        }
    }
}

// ── Parser ──

/// Parse a comma-separated filter expression into a list of rules.
/// Invalid globs are silently skipped.
pub fn parse_filter_expr(expr: &str) -> Vec<FilterRule> {
    let mut rules = Vec::new();
    for segment in expr.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let (include, body) = if let Some(rest) = segment.strip_prefix('-') {
            (false, rest.trim())
        } else if let Some(rest) = segment.strip_prefix('+') {
            (true, rest.trim())
        } else {
            (true, segment)
        };

        if body.is_empty() {
            continue;
        }

        if let Some(rule) = try_parse_size(include, body) {
            rules.push(rule);
            continue;
        }

        if let Some(rule) = try_parse_kind(include, body) {
            rules.push(rule);
            continue;
        }

        if let Ok(pattern) = Pattern::new(body) {
            rules.push(FilterRule::Glob { include, pattern });
        }
    }
    rules
}

fn try_parse_size(include: bool, body: &str) -> Option<FilterRule> {
    let (op, num_str) = if let Some(rest) = body.strip_prefix('>') {
        (SizeOp::GreaterThan, rest)
    } else if let Some(rest) = body.strip_prefix('<') {
        (SizeOp::LessThan, rest)
    } else {
        return None;
    };
    let threshold = num_str.trim().parse::<usize>().ok()?;
    Some(FilterRule::Size { include, op, threshold })
}

fn try_parse_kind(include: bool, body: &str) -> Option<FilterRule> {
    let kind = match body.to_lowercase().as_str() {
        "added" => ChangeKind::Added,
        "modified" => ChangeKind::Modified,
        "deleted" => ChangeKind::Deleted,
        _ => return None,
    };
    Some(FilterRule::Kind { include, kind })
}

// ── Evaluator ──

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Apply filter rules to a file. Returns true if the file should be visible.
/// Includes are OR-ed; any matching exclude hides the file.
pub fn apply_filter(rules: &[FilterRule], file: &FileEntry) -> bool {
    if rules.is_empty() {
        return true;
    }

    let has_includes = rules.iter().any(|r| r.is_include());
    let included = !has_includes || rules.iter().any(|r| r.is_include() && matches_rule(r, file));
    if !included {
        return false;
    }

    !rules.iter().any(|r| !r.is_include() && matches_rule(r, file))
}

fn matches_rule(rule: &FilterRule, file: &FileEntry) -> bool {
    match rule {
        FilterRule::Glob { pattern, .. } => pattern.matches_with(&file.path, MATCH_OPTIONS),
        FilterRule::Kind { kind, .. } => file.kind == *kind,
        FilterRule::Size { op, threshold, .. } => {
            let changed = file.adds + file.dels;
            match op {
                SizeOp::GreaterThan => changed > *threshold,
                SizeOp::LessThan => changed < *threshold,
            }
        }
    }
}
