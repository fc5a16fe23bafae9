//! Logging and tracing initialization.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::config::LoggingConfig;
use crate::error::RecastResult;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set. Output
/// goes to stderr unless a log file is configured, in which case it is
/// appended there without ANSI colors.
pub fn init_logging(config: &LoggingConfig) -> RecastResult<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let writer = log_writer(config)?;

    if config.json {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(writer)
            .with_ansi(config.file.is_none())
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber).ok();
    }
    Ok(())
}

/// Destination for log lines: the configured file, or stderr.
fn log_writer(config: &LoggingConfig) -> RecastResult<BoxMakeWriter> {
    let Some(path) = &config.file else {
        return Ok(BoxMakeWriter::new(std::io::stderr));
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BoxMakeWriter::new(Mutex::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_log_file_is_created_and_appended() {
        let dir = std::env::temp_dir().join(format!("recast-logging-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("logs").join("recast.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "earlier\n").unwrap();

        let config = LoggingConfig {
            file: Some(path.clone()),
            ..LoggingConfig::default()
        };
        let writer = log_writer(&config).unwrap();
        writer.make_writer().write_all(b"assembled\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "earlier\nassembled\n");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_file_parent_is_created() {
        let dir = std::env::temp_dir().join(format!("recast-logging-dir-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("run.log");

        let config = LoggingConfig {
            file: Some(path.clone()),
            ..LoggingConfig::default()
        };
        log_writer(&config).unwrap();

        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unopenable_log_file_is_io_error() {
        let dir = std::env::temp_dir().join(format!("recast-logging-bad-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        // a directory cannot be opened for appending
        let config = LoggingConfig {
            file: Some(dir.clone()),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            log_writer(&config),
            Err(crate::error::RecastError::Io(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
