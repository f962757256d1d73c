//! Child process launch: plain pipes or a PTY pair.

use crate::args::parse_args;
use core_state::{CoreError, CoreResult, PipeOpts};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::process::{Child, Command, Stdio};
use tracing::{debug, error};

/// A freshly spawned child with the parent-side pipe ends.
pub struct Spawned {
    pub child: Child,
    /// Writer towards the child's stdin (PTY master dup under
    /// INTERACT); present only when input feeding was requested.
    pub input: Option<OwnedFd>,
    /// Reader from the child's stdout (PTY master under INTERACT).
    pub output: Option<OwnedFd>,
}

fn last_os_error(what: &str) -> CoreError {
    let e = std::io::Error::last_os_error();
    error!(target: "pipe", what, error = %e, "spawn_syscall_failed");
    CoreError::Child(format!("{what}: {e}"))
}

/// `pipe(2)` wrapped into owned fds (read end, write end).
fn os_pipe() -> CoreResult<(OwnedFd, OwnedFd)> {
    let mut fds = [0i32; 2];
    // O_CLOEXEC would leak cleanly anyway; Command clears it on the
    // ends passed as stdio
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(last_os_error("pipe"));
    }
    Ok(unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) })
}

fn dup_fd(fd: &OwnedFd) -> CoreResult<OwnedFd> {
    fd.try_clone().map_err(|e| CoreError::Child(e.to_string()))
}

/// Allocate a PTY pair: (master, slave).
fn open_pty() -> CoreResult<(OwnedFd, OwnedFd)> {
    unsafe {
        let master = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
        if master < 0 {
            return Err(last_os_error("posix_openpt"));
        }
        let master = OwnedFd::from_raw_fd(master);
        if libc::grantpt(master.as_raw_fd()) != 0 || libc::unlockpt(master.as_raw_fd()) != 0 {
            return Err(last_os_error("grantpt/unlockpt"));
        }
        let mut name = [0 as libc::c_char; 128];
        if libc::ptsname_r(master.as_raw_fd(), name.as_mut_ptr(), name.len()) != 0 {
            return Err(last_os_error("ptsname_r"));
        }
        let slave = libc::open(name.as_ptr(), libc::O_RDWR);
        if slave < 0 {
            return Err(last_os_error("open pty slave"));
        }
        Ok((master, OwnedFd::from_raw_fd(slave)))
    }
}

/// Switch an fd to non-blocking reads.
pub fn set_nonblocking(fd: &OwnedFd) -> CoreResult<()> {
    let flags = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_GETFL) };
    if flags < 0
        || unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0
    {
        return Err(last_os_error("fcntl O_NONBLOCK"));
    }
    Ok(())
}

/// Result of one non-blocking read attempt.
pub enum ReadOutcome {
    Data(usize),
    Eof,
    WouldBlock,
    Failed,
}

/// Read up to `buf.len()` bytes from the fd. Raw-fd based so callers
/// can keep mutating the structure that owns the fd while reading.
pub fn read_fd(fd: std::os::fd::RawFd, buf: &mut [u8]) -> ReadOutcome {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
    match n {
        0 => ReadOutcome::Eof,
        n if n > 0 => ReadOutcome::Data(n as usize),
        _ => {
            let e = std::io::Error::last_os_error();
            if e.kind() == std::io::ErrorKind::WouldBlock {
                ReadOutcome::WouldBlock
            } else if e.raw_os_error() == Some(libc::EIO) {
                // a closed PTY slave reports EIO rather than EOF
                ReadOutcome::Eof
            } else {
                error!(target: "pipe", error = %e, "read_failed");
                ReadOutcome::Failed
            }
        }
    }
}

/// Write the whole buffer, retrying short writes.
pub fn write_fd(fd: std::os::fd::RawFd, mut buf: &[u8]) -> CoreResult<usize> {
    let mut total = 0;
    while !buf.is_empty() {
        let n = unsafe { libc::write(fd, buf.as_ptr().cast(), buf.len()) };
        if n < 0 {
            return Err(last_os_error("write"));
        }
        let n = n as usize;
        total += n;
        buf = &buf[n..];
    }
    Ok(total)
}

/// Launch `cmd` with an argv parsed from `argstr` (whose first token
/// is argv\[0\]).
///
/// Plain mode wires pipes: stdout (and stderr under REDIR_ERR) back
/// to the parent, stdin from the parent when input feeding is on,
/// otherwise closed. INTERACT allocates a PTY instead and keeps the
/// master for both directions. The child gets a fresh session under
/// the PTY and a `LANG=C` environment either way.
pub fn spawn_child(cmd: &str, argstr: &str, opts: PipeOpts) -> CoreResult<Spawned> {
    let argv = parse_args(argstr);
    if cmd.is_empty() || argv.is_empty() {
        return Err(CoreError::Child("no command to launch".into()));
    }
    let mut command = Command::new(cmd);
    command.args(&argv[1..]).env("LANG", "C");

    if opts.contains(PipeOpts::INTERACT) {
        let (master, slave) = open_pty()?;
        command
            .stdin(Stdio::from(dup_fd(&slave)?))
            .stdout(Stdio::from(dup_fd(&slave)?))
            .stderr(Stdio::from(slave));
        unsafe {
            use std::os::unix::process::CommandExt;
            command.pre_exec(|| {
                if libc::setsid() < 0 {
                    return Err(std::io::Error::last_os_error());
                }
                libc::ioctl(0, libc::TIOCSCTTY, 0);
                Ok(())
            });
        }
        let child = command
            .spawn()
            .map_err(|e| CoreError::Child(format!("{cmd}: {e}")))?;
        debug!(target: "pipe", pid = child.id(), cmd, "spawned_on_pty");
        let input = dup_fd(&master)?;
        return Ok(Spawned {
            child,
            input: Some(input),
            output: Some(master),
        });
    }

    let (out_read, out_write) = os_pipe()?;
    if opts.contains(PipeOpts::REDIR_ERR) {
        command.stderr(Stdio::from(dup_fd(&out_write)?));
    } else {
        command.stderr(Stdio::null());
    }
    command.stdout(Stdio::from(out_write));

    let input = if opts.contains(PipeOpts::IN_OUT) {
        let (in_read, in_write) = os_pipe()?;
        command.stdin(Stdio::from(in_read));
        Some(in_write)
    } else {
        command.stdin(Stdio::null());
        None
    };

    let child = command
        .spawn()
        .map_err(|e| CoreError::Child(format!("{cmd}: {e}")))?;
    debug!(target: "pipe", pid = child.id(), cmd, "spawned");
    Ok(Spawned {
        child,
        input,
        output: Some(out_read),
    })
}
