use crate::config::Config;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "rainguard-monitor.log";

/// Filter used when `RUST_LOG` is unset.
pub fn default_directive(debug: bool, level_env: Option<&str>) -> String {
    if debug {
        return "debug".to_string();
    }
    match level_env.map(str::trim) {
        Some(level) if !level.is_empty() => level.to_string(),
        _ => "info".to_string(),
    }
}

/// Append-mode log file under `log_dir`, or `None` when no directory is set.
pub fn open_log_file(log_dir: &str) -> io::Result<Option<Arc<File>>> {
    if log_dir.trim().is_empty() {
        return Ok(None);
    }
    let dir = Path::new(log_dir);
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE_NAME))?;
    Ok(Some(Arc::new(file)))
}

fn sink_writer(stderr: bool, file: Option<Arc<File>>) -> BoxMakeWriter {
    match (stderr, file) {
        (true, Some(file)) => BoxMakeWriter::new(io::stderr.and(file)),
        (true, None) => BoxMakeWriter::new(io::stderr),
        (false, Some(file)) => BoxMakeWriter::new(file),
        (false, None) => BoxMakeWriter::new(io::sink),
    }
}

/// Installs the global subscriber. Stdout is left to the feed printer.
/// Returns false when a subscriber was already installed.
pub fn init_logging(config: &Config) -> bool {
    let level_env = std::env::var("RAINGUARD_LOG_LEVEL").ok();
    let directive = default_directive(config.debug, level_env.as_deref());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let file = match open_log_file(&config.log_dir) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("log_file_error: {err}");
            None
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(sink_writer(config.log_stderr, file))
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn directive_prefers_debug_then_env_level() {
        assert_eq!(default_directive(true, Some("warn")), "debug");
        assert_eq!(default_directive(false, Some(" warn ")), "warn");
        assert_eq!(default_directive(false, Some("")), "info");
        assert_eq!(default_directive(false, None), "info");
    }

    #[test]
    fn empty_log_dir_disables_the_file() {
        assert!(open_log_file("").expect("open").is_none());
        assert!(open_log_file("   ").expect("open").is_none());
    }

    #[test]
    fn log_file_is_created_and_appended() {
        let dir = std::env::temp_dir().join(format!("rainguard-log-{}", std::process::id()));
        let dir_str = dir.to_string_lossy().to_string();

        for line in ["first\n", "second\n"] {
            let file = open_log_file(&dir_str).expect("open").expect("file");
            (&*file).write_all(line.as_bytes()).expect("write");
        }

        let contents = std::fs::read_to_string(dir.join(LOG_FILE_NAME)).expect("read");
        assert_eq!(contents, "first\nsecond\n");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
