//! The strata binary: CLI parsing, logging bootstrap, the terminal
//! input thread, and the wiring of dispatcher and renderer around the
//! core event loop.

use anyhow::Result;
use clap::Parser;
use core_events::Event;
use crossbeam_channel::bounded;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod dispatch;
mod render;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "curses style multi-buffer text editor")]
struct Cli {
    /// Configuration file to use instead of the discovered one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip configuration loading entirely.
    #[arg(short = 'n', long)]
    no_config: bool,

    /// Log file path (defaults to strata.log in the state dir).
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Files to open: FILE, FILE:N or +N FILE.
    files: Vec<String>,
}

/// One positional argument resolved to a path and an optional jump.
fn parse_file_args(args: &[String]) -> Vec<(String, Option<usize>)> {
    let mut out: Vec<(String, Option<usize>)> = Vec::new();
    let mut pending_line: Option<usize> = None;
    for arg in args {
        if let Some(n) = arg.strip_prefix('+') {
            if let Ok(n) = n.parse::<usize>() {
                match out.last_mut() {
                    // FILE +N applies backwards, +N FILE forwards
                    Some(last) if last.1.is_none() => last.1 = Some(n),
                    _ => pending_line = Some(n),
                }
                continue;
            }
        }
        let (name, line) = match arg.rsplit_once(':') {
            Some((name, n)) if !name.is_empty() => match n.parse::<usize>() {
                Ok(n) => (name.to_string(), Some(n)),
                Err(_) => (arg.clone(), None),
            },
            _ => (arg.clone(), None),
        };
        out.push((name, line.or(pending_line.take())));
    }
    out
}

fn init_logging(path: Option<PathBuf>) -> tracing_appender::non_blocking::WorkerGuard {
    let path = path.unwrap_or_else(|| PathBuf::from("strata.log"));
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let file = path.file_name().map(PathBuf::from).unwrap_or("strata.log".into());
    let appender = tracing_appender::rolling::never(
        dir.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        file,
    );
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(writer)
        .with_ansi(false)
        .init();
    guard
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_file.clone());
    info!(target: "main", ?cli, "starting");

    let opts = if cli.no_config {
        core_state::Options::default()
    } else {
        core_config::load_from(cli.config.clone())?
    };
    let mut state = core_state::EditorState::new(opts);

    let files = parse_file_args(&cli.files);
    for (name, line) in &files {
        if core_io::add_file(&mut state, name).is_ok()
            && let Some(line) = line
        {
            core_edit::cursor::goto_line(&mut state, *line);
        }
    }
    if state.ring.open_count() == 0 {
        state.scratch_buffer("*scratch*")?;
    }

    let (tx, rx) = bounded::<Event>(1024);
    std::thread::spawn(move || {
        // the input thread owns the blocking terminal read; it dies
        // with the channel when the loop ends
        loop {
            let Ok(ev) = crossterm::event::read() else {
                let _ = tx.send(Event::Shutdown);
                break;
            };
            let mapped = match ev {
                crossterm::event::Event::Key(k) => Some(Event::Input(k)),
                crossterm::event::Event::Resize(c, r) => Some(Event::Resize(c, r)),
                _ => None,
            };
            if let Some(ev) = mapped
                && tx.send(ev).is_err()
            {
                break;
            }
        }
    });

    let mut renderer = render::TerminalRenderer::enter()?;
    if let Ok((cols, rows)) = crossterm::terminal::size() {
        state.text_cols = cols as usize;
        state.text_rows = (rows as usize).saturating_sub(2).max(1);
    }
    let mut dispatcher = dispatch::CommandDispatcher::default();
    core_events::run_loop(&mut state, &rx, &mut dispatcher, &mut renderer);
    renderer.leave()?;
    info!(target: "main", "bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::parse_file_args;

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn plain_file() {
        assert_eq!(
            parse_file_args(&s(&["a.txt"])),
            [("a.txt".to_string(), None)]
        );
    }

    #[test]
    fn colon_line_number() {
        assert_eq!(
            parse_file_args(&s(&["a.txt:12"])),
            [("a.txt".to_string(), Some(12))]
        );
    }

    #[test]
    fn plus_before_and_after() {
        assert_eq!(
            parse_file_args(&s(&["+7", "a.txt"])),
            [("a.txt".to_string(), Some(7))]
        );
        assert_eq!(
            parse_file_args(&s(&["a.txt", "+9"])),
            [("a.txt".to_string(), Some(9))]
        );
    }

    #[test]
    fn colon_without_number_is_part_of_the_name() {
        assert_eq!(
            parse_file_args(&s(&["weird:name"])),
            [("weird:name".to_string(), None)]
        );
    }
}
