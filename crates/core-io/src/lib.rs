//! Buffer file I/O: open with inode dedup, sanitising reads, backed
//! up saves, the external-change watch, the hard reload and the
//! diff-driven smart reload.

mod files;
mod reload;

pub use files::{
    add_file, check_files, drop_file, list_buffers, quit_file, reload_file, restat_file,
    save_all, save_file,
};
pub use reload::{DiffHunk, parse_diff_header, reload_bydiff};
