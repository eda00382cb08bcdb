use log::LevelFilter;
use simplelog::*;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;

/// Initialize the logging system
///
/// Sets up both file and terminal logging:
/// - File: Always logs DEBUG and above to ~/.vacation-planner/logs/engine-YYYY-MM-DD.log
/// - Terminal: DEBUG+ in dev mode, INFO+ in production mode
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Get log directory and ensure it exists
    let log_dir = get_log_directory();
    fs::create_dir_all(&log_dir)?;

    let log_file_path = log_dir.join(get_log_filename());

    // Open log file in append mode (safe for multiple instances)
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    let file_logger = WriteLogger::new(
        LevelFilter::Debug,
        ConfigBuilder::new().set_time_format_rfc3339().build(),
        log_file,
    );

    let terminal_level = get_terminal_log_level();
    let terminal_logger = TermLogger::new(
        terminal_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );

    CombinedLogger::init(vec![terminal_logger, file_logger])?;

    log::info!(
        "Logger initialized - Terminal: {:?}, File: {:?} (DEBUG+)",
        terminal_level,
        log_file_path
    );

    Ok(())
}

/// Get the log directory path
///
/// Returns: ~/.vacation-planner/logs/
fn get_log_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".vacation-planner")
        .join("logs")
}

/// Get the log filename with current date
///
/// Returns: engine-YYYY-MM-DD.log (e.g. engine-2025-12-27.log)
fn get_log_filename() -> String {
    let today = chrono::Local::now().format("%Y-%m-%d");
    format!("engine-{}.log", today)
}

/// Determine terminal log level based on build mode
///
/// - Debug builds: DEBUG and above
/// - Release builds: INFO and above
fn get_terminal_log_level() -> LevelFilter {
    if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filename_is_dated() {
        let name = get_log_filename();
        assert!(name.starts_with("engine-"));
        assert!(name.ends_with(".log"));
        // engine- + YYYY-MM-DD + .log
        assert_eq!(name.len(), "engine-".len() + 10 + ".log".len());
    }

    #[test]
    fn test_log_directory_under_home() {
        let dir = get_log_directory();
        assert!(dir.ends_with(PathBuf::from(".vacation-planner").join("logs")));
    }
}
