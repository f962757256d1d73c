//! Global runtime options.
//!
//! Populated from the configuration file at startup; every field has
//! a working default so the editor runs with no config at all.

#[derive(Debug, Clone)]
pub struct Options {
    /// Tab stop width for visual column math.
    pub tabsize: usize,
    /// New lines from a split inherit the original's leading blanks.
    pub smart_indent: bool,
    /// Drop CR before LF on input instead of preserving it.
    pub fix_cr: bool,
    /// Regex matching is case sensitive.
    pub case_sensitive: bool,
    /// Delete the `<name>~` backup after a successful save.
    pub backup_nokeep: bool,
    /// Overwrite in place instead of unlink-then-create.
    pub save_inplace: bool,
    /// Moving a selection drops it instead of re-selecting the moved
    /// lines.
    pub move_reset: bool,
    /// Closing an overwrite-source `*sh*` buffer after `over_select`.
    pub close_over: bool,
    /// Indent with tabs rather than spaces.
    pub indent_tabs: bool,
    /// Spaces (or tabs) per indent step.
    pub indent_size: usize,
    /// Emit `--- N lines ---` shadow markers when writing filtered
    /// selections out to children.
    pub shadow_marks: bool,
    /// Cooperative loop tick.
    pub tick_ms: u64,
    /// Idle ticks between on-disk stat sweeps (50 ticks of 100 ms is
    /// the ~5 s of the original).
    pub stat_period_ticks: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            tabsize: 8,
            smart_indent: false,
            fix_cr: false,
            case_sensitive: false,
            backup_nokeep: false,
            save_inplace: false,
            move_reset: true,
            close_over: false,
            indent_tabs: false,
            indent_size: 4,
            shadow_marks: false,
            tick_ms: 100,
            stat_period_ticks: 50,
        }
    }
}
