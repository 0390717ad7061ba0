mod chunk;
mod expand;
mod lines;
mod section;

#[allow(unused_imports)]
pub use chunk::{
    diff_texts, load_worktree_diff, ChangeKind, DiffChunk, DiffChunkType, FileDiff,
    WorktreeDiff,
};
pub use expand::ExpandedSet;
pub use lines::{flatten, ProcessedLine};
#[allow(unused_imports)]
pub use section::{
    fold_keys, sectionize, EdgeContext, ExpandKey, Section, SectionKind, SectionOptions,
    DEFAULT_CONTEXT_RADIUS,
};
