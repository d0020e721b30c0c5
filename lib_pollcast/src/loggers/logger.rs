use anyhow::Result;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Maps a level name to a filter. Unknown names fall back to `Info`.
pub fn parse_level(log_level: &str) -> log::LevelFilter {
    match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// # Setup Logging
///
/// Installs the global logger. Output goes to stdout and to
/// `<log_dir>/<app_name>_<timestamp>.log`. Older log files of the same
/// application are deleted first.
///
/// # Errors
/// Fails if the directory or file cannot be created, or if a global logger is
/// already installed.
pub fn setup_logging(log_dir: &Path, log_level: &str, app_name: &str) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    // Clean up old log files, keeping only the most recent one
    cleanup_old_logs(log_dir, app_name)?;

    let log_file_name = format!("{}_{}.log", app_name, chrono::Local::now().format("%Y-%m-%d_%H-%M-%S"));
    let log_path = log_dir.join(log_file_name);

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(parse_level(log_level))
        // Keep the HTTP stack quiet unless explicitly asked for.
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("hyper_util", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_path)?)
        .apply()?;

    Ok(())
}

fn cleanup_old_logs(log_dir: &Path, app_name: &str) -> Result<()> {
    let prefix = format!("{}_", app_name);
    let mut entries: Vec<(SystemTime, std::path::PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix))
        })
        .map(|p| {
            let modified = fs::metadata(&p)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, p)
        })
        .collect();

    // Newest first
    entries.sort_by(|a, b| b.cmp(a));

    for (_, path) in entries.iter().skip(1) {
        if let Err(e) = fs::remove_file(path) {
            eprintln!("Failed to delete old log file {:?}: {}", path, e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        fs::write(&path, b"x").unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(mtime)
            .unwrap();
    }

    #[test]
    fn test_cleanup_keeps_newest_log_of_the_app() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "server_pollcast_old.log", 300);
        touch(dir.path(), "server_pollcast_new.log", 10);
        touch(dir.path(), "server_mock_other.log", 600);
        touch(dir.path(), "notes.txt", 900);

        cleanup_old_logs(dir.path(), "server_pollcast").unwrap();

        assert!(dir.path().join("server_pollcast_new.log").exists());
        assert!(!dir.path().join("server_pollcast_old.log").exists());
        assert!(dir.path().join("server_mock_other.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), log::LevelFilter::Debug);
        assert_eq!(parse_level("trace"), log::LevelFilter::Trace);
        assert_eq!(parse_level("verbose"), log::LevelFilter::Info);
    }
}
