// src/logging.rs

//! Logger setup. One-shot commands log to the terminal; the interactive
//! screen owns the terminal, so it logs to a file.

use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};
use std::fs::OpenOptions;
use std::path::Path;

pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

fn log_config() -> simplelog::Config {
    ConfigBuilder::new()
        .add_filter_allow_str("reportsync")
        .set_target_level(LevelFilter::Off)
        .build()
}

pub fn init_terminal_logger(level: LevelFilter) -> Result<()> {
    TermLogger::init(level, log_config(), TerminalMode::Stderr, ColorChoice::Auto)
        .context("Failed to initialise terminal logger")
}

pub fn init_file_logger(level: LevelFilter, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;
    WriteLogger::init(level, log_config(), file).context("Failed to initialise file logger")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("chatty"), LevelFilter::Info);
    }
}
