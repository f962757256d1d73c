//! Configuration loading and parsing.
//!
//! `strata.toml` is looked for in the working directory first, then
//! in the platform config dir. Unknown fields are ignored and a file
//! that fails to parse falls back to defaults, so an old binary keeps
//! working against a newer config. Every field is optional; the
//! defaults live with [`core_state::Options`].

use anyhow::Result;
use core_state::Options;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct EditConfig {
    pub tabsize: Option<usize>,
    pub smart_indent: Option<bool>,
    pub indent_tabs: Option<bool>,
    pub indent_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct FileConfig {
    /// Drop CR before LF on input.
    pub fix_cr: Option<bool>,
    /// Delete the backup after a successful save.
    pub backup_nokeep: Option<bool>,
    /// Overwrite in place instead of unlink-then-create.
    pub save_inplace: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SearchConfig {
    pub case_sensitive: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SelectConfig {
    /// Moving a selection drops it instead of re-selecting.
    pub move_reset: Option<bool>,
    /// Close the `*sh*` source after an overwrite.
    pub close_over: Option<bool>,
    /// Shadow markers in piped-out selections.
    pub shadow_marks: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoopConfig {
    /// Cooperative tick in milliseconds.
    pub tick_ms: Option<u64>,
    /// Idle ticks between on-disk stat sweeps.
    pub stat_period_ticks: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub edit: EditConfig,
    #[serde(default)]
    pub file: FileConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub select: SelectConfig,
    #[serde(rename = "loop", default)]
    pub tick: LoopConfig,
}

impl ConfigFile {
    /// Overlay this file onto the built-in defaults.
    pub fn into_options(self) -> Options {
        let mut o = Options::default();
        let e = self.edit;
        if let Some(v) = e.tabsize {
            o.tabsize = v.clamp(1, 64);
        }
        if let Some(v) = e.smart_indent {
            o.smart_indent = v;
        }
        if let Some(v) = e.indent_tabs {
            o.indent_tabs = v;
        }
        if let Some(v) = e.indent_size {
            o.indent_size = v.clamp(1, 16);
        }
        let f = self.file;
        if let Some(v) = f.fix_cr {
            o.fix_cr = v;
        }
        if let Some(v) = f.backup_nokeep {
            o.backup_nokeep = v;
        }
        if let Some(v) = f.save_inplace {
            o.save_inplace = v;
        }
        if let Some(v) = self.search.case_sensitive {
            o.case_sensitive = v;
        }
        let s = self.select;
        if let Some(v) = s.move_reset {
            o.move_reset = v;
        }
        if let Some(v) = s.close_over {
            o.close_over = v;
        }
        if let Some(v) = s.shadow_marks {
            o.shadow_marks = v;
        }
        let t = self.tick;
        if let Some(v) = t.tick_ms {
            o.tick_ms = v.clamp(10, 2000);
        }
        if let Some(v) = t.stat_period_ticks {
            o.stat_period_ticks = v.max(1);
        }
        o
    }
}

/// Best-effort config path: working directory first, then the
/// platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("strata.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("strata").join("strata.toml");
    }
    PathBuf::from("strata.toml")
}

/// Load options from the given path (or the discovered one); any
/// failure falls back to defaults.
pub fn load_from(path: Option<PathBuf>) -> Result<Options> {
    let path = path.unwrap_or_else(discover);
    match fs::read_to_string(&path) {
        Ok(content) => match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                info!(target: "config", ?path, "config_loaded");
                Ok(file.into_options())
            }
            Err(e) => {
                warn!(target: "config", ?path, error = %e, "config_parse_failed_using_defaults");
                Ok(Options::default())
            }
        },
        Err(_) => Ok(Options::default()),
    }
}
