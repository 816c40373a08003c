//! Process-wide logger.
//!
//! - `JUKEBOX_LOG`: filter directives in `env_logger` syntax
//! - `JUKEBOX_LOG_TARGET`: `stderr` (default) or `stdout`
//! - `JUKEBOX_LOG_STYLE`: `auto` (default), `always` or `never`
//!
//! Lines look like `2026-10-18T09:14:03.512Z WARN  render::presenter: ...`.

use std::env;
use std::fmt::Display;
use std::io::{self, IsTerminal, Write};

use env_logger::{Builder, Env};
use log::{Level, LevelFilter, Record};
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

pub use log::{debug, error, info, trace, warn};

const DEFAULT_FILTER: &str = "jukebox=info,jukebox_kiosk=info";
const FILTER_ENV: &str = "JUKEBOX_LOG";
const TARGET_ENV: &str = "JUKEBOX_LOG_TARGET";
const STYLE_ENV: &str = "JUKEBOX_LOG_STYLE";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogTarget {
    #[default]
    Stderr,
    Stdout,
}

impl LogTarget {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "stderr" => Some(LogTarget::Stderr),
            "stdout" => Some(LogTarget::Stdout),
            _ => None,
        }
    }

    fn is_terminal(self) -> bool {
        match self {
            LogTarget::Stderr => io::stderr().is_terminal(),
            LogTarget::Stdout => io::stdout().is_terminal(),
        }
    }

    fn writer(self, color: ColorChoice) -> BufferWriter {
        match self {
            LogTarget::Stderr => BufferWriter::stderr(color),
            LogTarget::Stdout => BufferWriter::stdout(color),
        }
    }
}

/// `auto` colours only when the target is a terminal.
fn color_choice(style: Option<&str>, target: LogTarget) -> ColorChoice {
    match style.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ if target.is_terminal() => ColorChoice::Auto,
        _ => ColorChoice::Never,
    }
}

fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::Magenta,
        Level::Debug => Color::Cyan,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
    }
}

/// Module path without the library's own crate name.
fn short_module<'a>(record: &Record<'a>) -> &'a str {
    let module = record.module_path_static().unwrap_or("<unknown>");
    module.strip_prefix("jukebox::").unwrap_or(module)
}

fn write_record(
    out: &mut impl WriteColor,
    timestamp: impl Display,
    record: &Record,
) -> io::Result<()> {
    write!(out, "{} ", timestamp)?;

    let mut spec = ColorSpec::new();
    spec.set_fg(Some(level_color(record.level())))
        .set_bold(record.level() <= Level::Warn);
    out.set_color(&spec)?;
    write!(out, "{:<5}", record.level())?;
    out.reset()?;

    writeln!(out, " {}: {}", short_module(record), record.args())
}

pub fn init_logger() {
    let target_value = env::var(TARGET_ENV).ok();
    let target = target_value
        .as_deref()
        .and_then(LogTarget::parse)
        .unwrap_or_default();
    let color = color_choice(env::var(STYLE_ENV).ok().as_deref(), target);

    let mut builder =
        Builder::from_env(Env::new().filter_or(FILTER_ENV, DEFAULT_FILTER));
    builder.filter_module("notify", LevelFilter::Warn);

    builder.format(move |buf, record| {
        let writer = target.writer(color);
        let mut buffer = writer.buffer();
        write_record(&mut buffer, buf.timestamp_millis(), record)?;
        writer.print(&buffer)
    });

    if builder.try_init().is_err() {
        return;
    }
    if let Some(value) = target_value {
        if LogTarget::parse(&value).is_none() {
            warn!("unknown {} '{}', logging to stderr", TARGET_ENV, value);
        }
    }
}
