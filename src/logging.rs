use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// env_logger filter string, e.g. "info" or "flight_sonifier=debug"
    pub level: String,
    /// Append to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Default log file location (in the user's local data directory)
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("flight-sonifier")
        .join("logs")
        .join("flight-sonifier.log")
}

/// Initialize logging. `RUST_LOG`, when set, overrides the configured level.
///
/// Calling this more than once keeps the first logger.
pub fn init_logging(config: &LogConfig) -> io::Result<()> {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&config.level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{}",
            format_line(&record.level().to_string(), record.target(), &record.args().to_string())
        )
    });

    if let Some(path) = &config.file {
        let file = open_log_file(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }

    if builder.try_init().is_ok() {
        log::info!("Logging initialized at level '{}'", config.level);
    }
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    // Create logs directory if it doesn't exist
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

fn format_line(level: &str, target: &str, message: &str) -> String {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
    format!("[{}] [{}] [{}] {}", timestamp, level, target, message)
}
