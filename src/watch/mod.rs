use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, DebouncedEventKind};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// Events emitted by the file watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// One or more paths changed; the diff should be reloaded
    FilesChanged(Vec<String>),
    /// The OS watcher failed; live updates may have stopped
    Error(String),
}

/// A debounced watcher over the diff source (a working tree or a single file)
pub struct FileWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
}

impl FileWatcher {
    /// Start watching `root`. Directories are watched recursively; a single file
    /// is watched through its parent so editors that replace it on save still
    /// trigger events. Events are debounced by `debounce_ms` milliseconds.
    pub fn new(root: &Path, debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let (watch_root, mode, only) = if root.is_dir() {
            (root.to_path_buf(), RecursiveMode::Recursive, None)
        } else {
            let parent = match root.parent() {
                Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
                _ => PathBuf::from("."),
            };
            (parent, RecursiveMode::NonRecursive, root.file_name().map(|n| n.to_os_string()))
        };

        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<DebouncedEvent>, notify::Error>| {
                let event = match result {
                    Ok(events) => {
                        let paths: Vec<String> = events
                            .iter()
                            .filter(|e| e.kind == DebouncedEventKind::Any)
                            .filter(|e| is_relevant(&e.path))
                            .filter(|e| match &only {
                                Some(name) => e.path.file_name() == Some(name.as_os_str()),
                                None => true,
                            })
                            .map(|e| e.path.to_string_lossy().to_string())
                            .collect();
                        if paths.is_empty() {
                            return;
                        }
                        WatchEvent::FilesChanged(paths)
                    }
                    Err(err) => WatchEvent::Error(err.to_string()),
                };
                // Receiver gone means the UI has exited
                let _ = tx.send(event);
            },
        )?;

        debouncer
            .watcher()
            .watch(&watch_root, mode)
            .with_context(|| format!("Failed to watch '{}'", watch_root.display()))?;
        log::info!("watching {} ({}ms debounce)", root.display(), debounce_ms);

        Ok(FileWatcher {
            _watcher: debouncer,
        })
    }
}

/// Working-tree paths are relevant. Inside `.git/` only the index (staging)
/// and refs (commits, branch moves) are; objects and logs are noise.
fn is_relevant(path: &Path) -> bool {
    let mut components = path.components();
    while let Some(component) = components.next() {
        if component == Component::Normal(".git".as_ref()) {
            let rest = components.as_path();
            return rest == Path::new("index") || rest.starts_with("refs");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn working_tree_paths_are_relevant() {
        assert!(is_relevant(&PathBuf::from("/repo/src/main.rs")));
        assert!(is_relevant(&PathBuf::from("/repo/.gitignore")));
    }

    #[test]
    fn git_internals_are_filtered() {
        assert!(is_relevant(&PathBuf::from("/repo/.git/index")));
        assert!(is_relevant(&PathBuf::from("/repo/.git/refs/heads/main")));
        assert!(!is_relevant(&PathBuf::from("/repo/.git/objects/ab/cdef")));
        assert!(!is_relevant(&PathBuf::from("/repo/.git/index.lock")));
        assert!(!is_relevant(&PathBuf::from("/repo/.git/logs/HEAD")));
    }
}
