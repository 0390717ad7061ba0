use anyhow::{Context, Result};
use std::process::Command;

/// File change status in git
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed(String), // old path
}

/// A path that differs between the base revision and the working tree
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
}

impl ChangedFile {
    /// Path of the file on the base side
    pub fn old_path(&self) -> &str {
        match &self.status {
            FileStatus::Renamed(old) => old,
            _ => &self.path,
        }
    }
}

// ── Repo Info ──

/// Get the repository root directory for a specific path
pub fn get_repo_root_in(dir: &str) -> Result<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(dir)
        .output()
        .context(format!("Failed to run git in '{}'", dir))?;

    if !output.status.success() {
        anyhow::bail!("Not a git repository: {}", dir);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Auto-detect the base branch by checking upstream tracking, then falling
/// back to common names (main, master, develop), then HEAD.
pub fn detect_base_branch_in(repo_root: &str) -> Result<String> {
    // Helper: run a git command and return trimmed stdout on success
    let run = |args: &[&str]| -> Option<String> {
        let out = Command::new("git")
            .args(args)
            .current_dir(repo_root)
            .output()
            .ok()?;
        if out.status.success() {
            Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
        } else {
            None
        }
    };

    let current = run(&["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_default();

    if let Some(upstream) = run(&["rev-parse", "--abbrev-ref", "@{upstream}"]) {
        if let Some(branch) = upstream.split('/').next_back() {
            if branch != current && !branch.is_empty() && run(&["rev-parse", "--verify", branch]).is_some() {
                return Ok(branch.to_string());
            }
        }
    }

    for candidate in ["main", "master", "develop"] {
        if candidate != current && run(&["rev-parse", "--verify", candidate]).is_some() {
            return Ok(candidate.to_string());
        }
    }

    Ok("HEAD".to_string())
}

// ── Changes ──

/// List files that differ between `base` and the working tree, untracked files included
pub fn changed_files(repo_root: &str, base: &str) -> Result<Vec<ChangedFile>> {
    let output = Command::new("git")
        .args(["diff", "--name-status", "-z", "-M", "--no-color", base, "--"])
        .current_dir(repo_root)
        .output()
        .context("Failed to run git diff")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("git diff failed: {}", stderr.trim());
    }

    let mut files = parse_name_status(&String::from_utf8_lossy(&output.stdout));

    let untracked = Command::new("git")
        .args(["ls-files", "-z", "--others", "--exclude-standard"])
        .current_dir(repo_root)
        .output()
        .context("Failed to list untracked files")?;

    if untracked.status.success() {
        for path in String::from_utf8_lossy(&untracked.stdout).split('\0') {
            if !path.is_empty() && !files.iter().any(|f| f.path == path) {
                files.push(ChangedFile {
                    path: path.to_string(),
                    status: FileStatus::Added,
                });
            }
        }
    }

    log::debug!("{} changed files against {}", files.len(), base);
    Ok(files)
}

/// Parse `git diff --name-status -z` output. Fields are NUL-separated so paths
/// come through unquoted: "M\0path\0", "R087\0old\0new\0". A truncated record ends parsing.
pub fn parse_name_status(raw: &str) -> Vec<ChangedFile> {
    let mut files = Vec::new();
    let mut fields = raw.split('\0').filter(|f| !f.is_empty());
    while let Some(code) = fields.next() {
        let Some(first) = fields.next() else { break };

        let file = match code.chars().next() {
            Some('A') => ChangedFile { path: first.to_string(), status: FileStatus::Added },
            Some('D') => ChangedFile { path: first.to_string(), status: FileStatus::Deleted },
            Some('R') | Some('C') => match fields.next() {
                Some(new_path) => ChangedFile {
                    path: new_path.to_string(),
                    status: FileStatus::Renamed(first.to_string()),
                },
                None => break,
            },
            Some(_) => ChangedFile { path: first.to_string(), status: FileStatus::Modified },
            None => continue,
        };
        files.push(file);
    }
    files
}

/// Contents of `path` at `rev`, or an empty string when the path does not exist there
pub fn file_at_rev(repo_root: &str, rev: &str, path: &str) -> Result<String> {
    let object = format!("{}:{}", rev, path);
    let output = Command::new("git")
        .args(["show", &object])
        .current_dir(repo_root)
        .output()
        .context(format!("Failed to run git show {}", object))?;

    if !output.status.success() {
        log::debug!("{} not present, treating as empty", object);
        return Ok(String::new());
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
