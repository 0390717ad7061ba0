pub mod filter;
mod source;
mod state;

pub use source::DiffSource;
#[allow(unused_imports)]
pub use state::{App, FileEntry, HEADER_ROWS};
