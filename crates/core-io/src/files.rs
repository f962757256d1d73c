//! File open, save, backup, re-stat and the hard reload.

use core_line::sanitize_line;
use core_state::{
    Buffer, BufferFlags, CoreError, CoreResult, EditorState, LineFlags, StatSnapshot,
};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Open a file into the ring, or switch to it when its inode is
/// already open. Relative paths are canonicalised for identity;
/// missing files open as an empty buffer that saves into place.
pub fn add_file(state: &mut EditorState, fname: &str) -> CoreResult<usize> {
    let meta = fs::metadata(fname).ok();
    if let Some(meta) = &meta {
        use std::os::unix::fs::MetadataExt;
        if let Some(ri) = state.ring.find_inode(meta.dev(), meta.ino()) {
            state.ring.set_current(ri);
            return Ok(ri);
        }
        if !meta.is_file() {
            state.tracemsg(format!("not a regular file [{fname}]"));
            return Err(CoreError::Io(std::io::Error::other("not a regular file")));
        }
    }
    let ri = state.scratch_buffer(fname)?;
    if meta.is_some() {
        let fix_cr = state.opts.fix_cr;
        let buffer = state.cur_mut()?;
        if let Err(e) = read_into(buffer, fname, fix_cr) {
            error!(target: "io", fname, error = %e, "read_failed");
            drop_current_without_teardown(state);
            state.tracemsg(format!("read file [{fname}] failed!"));
            return Err(e);
        }
    } else {
        // brand new file: keep the empty buffer, leave SCRATCH off so
        // the first save creates it
        let buffer = state.cur_mut()?;
        buffer.path = Some(PathBuf::from(fname));
        buffer.flags.remove(BufferFlags::SCRATCH);
    }
    info!(target: "io", fname, ri, "file_opened");
    Ok(ri)
}

/// Read all lines of `fname` into the (fresh) buffer, sanitising each
/// and marking fixed lines CHANGED.
fn read_into(buffer: &mut Buffer, fname: &str, fix_cr: bool) -> CoreResult<()> {
    let read_write = fs::OpenOptions::new().read(true).write(true).open(fname);
    let (file, readonly) = match read_write {
        Ok(f) => (f, false),
        Err(_) => (fs::File::open(fname)?, true),
    };
    let meta = file.metadata()?;
    buffer.stat = Some(StatSnapshot::from_metadata(&meta));
    buffer.flags.set(BufferFlags::READ_ONLY, readonly);
    buffer.path = Some(fs::canonicalize(fname).unwrap_or_else(|_| PathBuf::from(fname)));

    let mut reader = BufReader::new(file);
    let mut at = buffer.lines.top();
    let mut raw: Vec<u8> = Vec::new();
    let mut fixes = 0usize;
    loop {
        raw.clear();
        let n = reader.read_until(b'\n', &mut raw)?;
        if n == 0 {
            break;
        }
        let changed = sanitize_line(&mut raw, fix_cr);
        let trimmed = raw.strip_suffix(b"\n").unwrap_or(&raw);
        at = buffer.lines.append(at, trimmed)?;
        if changed {
            buffer.line_mut(at).flags.insert(LineFlags::CHANGED);
            fixes += 1;
        }
        buffer.num_lines += 1;
    }
    buffer.flags.remove(BufferFlags::SCRATCH);
    buffer.curr = buffer.lines.top();
    buffer.lineno = 0;
    if fixes > 0 {
        warn!(target: "io", fname, fixes, "input_lines_sanitised");
    } else {
        debug!(target: "io", fname, lines = buffer.num_lines, "file_read");
    }
    Ok(())
}

/// Create the `<path>~` backup (falling back to `/tmp/<base>~`),
/// returning the backup path actually written.
fn backup_file(path: &Path) -> CoreResult<PathBuf> {
    let mut backup = path.as_os_str().to_owned();
    backup.push("~");
    let backup = PathBuf::from(backup);
    if fs::copy(path, &backup).is_ok() {
        return Ok(backup);
    }
    let base = path
        .file_name()
        .map(|b| b.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".into());
    let fallback = PathBuf::from(format!("/tmp/{base}~"));
    fs::copy(path, &fallback)?;
    Ok(fallback)
}

/// Save the current buffer.
///
/// With a new name this is "save as" and refuses to overwrite a
/// different existing inode. The regular save backs the file up
/// first, then replaces it by unlink-and-create (or in place when
/// configured). On success every line's CHANGED folds into the sticky
/// ALTERED and the stat snapshot is refreshed.
pub fn save_file(state: &mut EditorState, newfname: &str) -> CoreResult<()> {
    let save_as = !newfname.is_empty();
    let backup_nokeep = state.opts.backup_nokeep;
    let save_inplace = state.opts.save_inplace;
    {
        let buffer = state.cur()?;
        if !save_as && buffer.is_special() {
            return Ok(());
        }
    }

    let target: PathBuf = if save_as {
        let new_path = PathBuf::from(newfname);
        if let Ok(meta) = fs::metadata(&new_path) {
            use std::os::unix::fs::MetadataExt;
            let same = state.cur()?.stat.map(|s| (s.dev, s.ino)) == Some((meta.dev(), meta.ino()));
            if !same {
                state.tracemsg(format!("will not overwrite existing file [{newfname}]"));
                return Err(CoreError::Io(std::io::Error::other(
                    "refusing to overwrite different inode",
                )));
            }
        }
        new_path
    } else {
        match &state.cur()?.path {
            Some(p) => p.clone(),
            None => {
                state.tracemsg("no file name");
                return Err(CoreError::Io(std::io::Error::other("no file name")));
            }
        }
    };

    let mut backup = None;
    if fs::metadata(&target).is_ok() {
        match backup_file(&target) {
            Ok(path) => backup = Some(path),
            Err(e) => {
                error!(target: "io", ?target, error = %e, "backup_failed");
                state.tracemsg("backup failed, file not saved");
                return Err(e);
            }
        }
    }

    let write_result = (|| -> CoreResult<()> {
        if !save_inplace {
            let _ = fs::remove_file(&target);
        }
        let mut file = fs::File::create(&target)?;
        let buffer = state.cur()?;
        for id in buffer.lines.iter_text() {
            file.write_all(buffer.line(id).bytes())?;
        }
        file.flush()?;
        Ok(())
    })();

    if let Err(e) = write_result {
        error!(target: "io", ?target, error = %e, "save_failed");
        // leave SCRATCH set so the user sees the buffer has no good
        // on-disk backing any more
        let buffer = state.cur_mut()?;
        buffer.flags.insert(BufferFlags::SCRATCH | BufferFlags::READ_ONLY);
        state.tracemsg("save failed!");
        return Err(e);
    }

    let meta = fs::metadata(&target)?;
    let buffer = state.cur_mut()?;
    buffer.stat = Some(StatSnapshot::from_metadata(&meta));
    buffer.path = Some(fs::canonicalize(&target).unwrap_or(target.clone()));
    if save_as {
        buffer.name = newfname.to_string();
    }
    buffer
        .flags
        .remove(BufferFlags::CHANGED | BufferFlags::DISK_CHANGED | BufferFlags::SCRATCH);
    let ids: Vec<_> = buffer.lines.iter_text().collect();
    for id in ids {
        let line = buffer.line_mut(id);
        if line.flags.contains(LineFlags::CHANGED) {
            line.flags.remove(LineFlags::CHANGED);
            line.flags.insert(LineFlags::ALTERED);
        }
    }
    if backup_nokeep && let Some(backup) = backup {
        let _ = fs::remove_file(backup);
    }
    info!(target: "io", ?target, "file_saved");
    Ok(())
}

/// Re-stat one open regular buffer: a newer mtime raises
/// DISK_CHANGED once, and the access bits keep READ_ONLY / SCRATCH
/// honest. Returns true on a state change worth a redraw.
pub fn restat_file(state: &mut EditorState, ri: usize) -> bool {
    let Some(buffer) = state.ring.get(ri) else {
        return false;
    };
    if buffer.is_scratch() || buffer.is_special() {
        return false;
    }
    let Some(path) = buffer.path.clone() else {
        return false;
    };
    let name = buffer.name.clone();
    match fs::metadata(&path) {
        Ok(meta) => {
            let test = StatSnapshot::from_metadata(&meta);
            let mut changed = false;
            let old = state.ring.get(ri).and_then(|b| b.stat);
            if let Some(old) = old {
                if old.ino != test.ino {
                    state.tracemsg(format!("file {name} on disk has new inode"));
                    changed = true;
                } else if old.mtime < test.mtime {
                    let buffer = state.ring.get_mut(ri).expect("slot open");
                    if !buffer.flags.contains(BufferFlags::DISK_CHANGED) {
                        buffer.flags.insert(BufferFlags::DISK_CHANGED);
                        state.tracemsg(format!("file {name} modified on disk!!"));
                        changed = true;
                    }
                }
            }
            let buffer = state.ring.get_mut(ri).expect("slot open");
            if buffer.flags.contains(BufferFlags::READ_ONLY) != test.readonly {
                buffer.flags.set(BufferFlags::READ_ONLY, test.readonly);
                changed = true;
            }
            changed
        }
        Err(_) => {
            state.tracemsg(format!("cannot stat {name} file!"));
            let buffer = state.ring.get_mut(ri).expect("slot open");
            buffer.flags.insert(BufferFlags::SCRATCH);
            true
        }
    }
}

/// The periodic sweep over every open buffer.
pub fn check_files(state: &mut EditorState) -> bool {
    let mut changed = false;
    for ri in state.ring.open_indices().collect::<Vec<_>>() {
        changed |= restat_file(state, ri);
    }
    changed
}

/// Hard reload: wipe the line list and re-read the file from disk,
/// restoring the cursor line when still in range.
pub fn reload_file(state: &mut EditorState) -> CoreResult<()> {
    let fix_cr = state.opts.fix_cr;
    let tabsize = state.opts.tabsize;
    let (fname, keep_lineno) = {
        let buffer = state.cur()?;
        if buffer.is_special() {
            return Ok(());
        }
        let Some(path) = buffer.path.clone() else {
            return Ok(());
        };
        (path.to_string_lossy().into_owned(), buffer.lineno)
    };
    state.clean_current_buffer()?;
    {
        let buffer = state.cur_mut()?;
        if let Err(e) = read_into(buffer, &fname, fix_cr) {
            buffer.flags.insert(BufferFlags::SCRATCH);
            state.tracemsg(format!("Cannot reload file [{fname}]"));
            return Err(e);
        }
        buffer.flags.remove(BufferFlags::DISK_CHANGED | BufferFlags::SCRATCH);
        let lineno = keep_lineno.min(buffer.num_lines);
        if let Some(id) = buffer.goto_lineno(lineno) {
            buffer.set_position(lineno, id, tabsize);
        }
    }
    info!(target: "io", fname, "file_reloaded");
    Ok(())
}

/// Detach the current slot without child/bookmark teardown; only for
/// fresh buffers that never got content.
fn drop_current_without_teardown(state: &mut EditorState) {
    let ri = state.ring.current_index();
    let origin = state.ring.get(ri).and_then(|b| b.origin);
    state.ring.take(ri);
    match origin {
        Some(o) if state.ring.get(o).is_some() => state.ring.set_current(o),
        _ => {
            state.ring.next_file();
        }
    }
}

/// Close the current buffer unconditionally: stop its child, reset a
/// selection living here, clear bookmarks and motion history, free
/// the lines, then return to the recorded origin (or the next open
/// buffer).
pub fn drop_file(state: &mut EditorState) -> CoreResult<()> {
    let ri = state.ring.current_index();
    if state.ring.get(ri).is_none() {
        return Err(CoreError::NoBuffer);
    }
    if state.select_ri == Some(ri) {
        state.reset_select();
    }
    state.bookmarks.clear_ring(ri);
    state.mhist.clear_ring(ri);
    let mut buffer = state.ring.take(ri).expect("slot open");
    core_pipe::stop_child_of(&mut buffer);
    // dropping the buffer frees lines and regex handles
    let origin = buffer.origin;
    drop(buffer);
    match origin {
        Some(o) if state.ring.get(o).is_some() => state.ring.set_current(o),
        _ => {
            state.ring.next_file();
        }
    }
    info!(target: "io", ri, "buffer_dropped");
    Ok(())
}

/// Close the current buffer unless it has unsaved changes.
pub fn quit_file(state: &mut EditorState) -> CoreResult<()> {
    if state.cur()?.flags.contains(BufferFlags::CHANGED) {
        state.tracemsg("changed buffer, use save or force quit");
        return Ok(());
    }
    drop_file(state)
}

/// Save every changed regular buffer.
pub fn save_all(state: &mut EditorState) -> CoreResult<()> {
    let current = state.ring.current_index();
    for ri in state.ring.open_indices().collect::<Vec<_>>() {
        let wants_save = state.ring.get(ri).is_some_and(|b| {
            b.flags.contains(BufferFlags::CHANGED) && !b.is_special() && !b.is_scratch()
        });
        if wants_save {
            state.ring.set_current(ri);
            save_file(state, "")?;
        }
    }
    state.ring.set_current(current);
    Ok(())
}

/// Regenerate the `*ring*` listing buffer describing every open slot.
pub fn list_buffers(state: &mut EditorState) -> CoreResult<()> {
    let mut rows: Vec<String> = Vec::new();
    for ri in state.ring.open_indices() {
        let Some(b) = state.ring.get(ri) else {
            continue;
        };
        if b.name == "*ring*" {
            continue;
        }
        let mut marks = String::new();
        if b.flags.contains(BufferFlags::CHANGED) {
            marks.push('*');
        }
        if b.flags.contains(BufferFlags::READ_ONLY) {
            marks.push('%');
        }
        if b.is_scratch() {
            marks.push('+');
        }
        if b.flags.contains(BufferFlags::HIDDEN) {
            marks.push('-');
        }
        rows.push(format!(
            "{ri:>2} {marks:<3} {:>6} lines  line {:>5}  {}",
            b.num_lines, b.lineno, b.name
        ));
    }
    state.scratch_buffer("*ring*")?;
    state.clean_current_buffer()?;
    let buffer = state.cur_mut()?;
    buffer
        .flags
        .insert(BufferFlags::SPECIAL | BufferFlags::NO_EDIT | BufferFlags::NO_ADD_LINE);
    let mut at = buffer.lines.top();
    for row in rows {
        at = buffer.lines.append(at, row.as_bytes())?;
        buffer.num_lines += 1;
    }
    buffer.curr = buffer.lines.first_text().unwrap_or(buffer.lines.bottom());
    buffer.lineno = 1;
    Ok(())
}
