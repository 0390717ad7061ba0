mod status;
mod worktree;

#[allow(unused_imports)]
pub use status::{
    changed_files, detect_base_branch_in, file_at_rev, get_repo_root_in, parse_name_status,
    ChangedFile, FileStatus,
};
pub use worktree::worktree_diff;
