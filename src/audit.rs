//! Append-only text audit log.
//!
//! Every mutating action and every login attempt produces one line in the
//! main log; access-denied events go to a separate file. Write failures are
//! logged and swallowed so an unwritable log never fails the user action.

use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Which of the two log files to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Main,
    Denied,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    main_path: PathBuf,
    denied_path: PathBuf,
}

impl AuditLog {
    pub fn new(main_path: impl Into<PathBuf>, denied_path: impl Into<PathBuf>) -> Self {
        Self {
            main_path: main_path.into(),
            denied_path: denied_path.into(),
        }
    }

    /// Appends one `<timestamp> - INFO - <action> [by <user>] [- Details: …]`
    /// line. Access-denied actions are routed to the denied-events file.
    pub fn record(&self, action: &str, details: Option<&str>, username: Option<&str>) {
        let mut message = action.to_string();
        if let Some(user) = username {
            message.push_str(&format!(" by {user}"));
        }
        if let Some(details) = details {
            message.push_str(&format!(" - Details: {details}"));
        }

        let line = format!(
            "{} - INFO - {}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            message
        );

        let path = if action.starts_with("Access denied") {
            &self.denied_path
        } else {
            &self.main_path
        };

        if let Err(e) = append_line(path, &line) {
            warn!(path = %path.display(), error = %e, "failed to write audit log entry");
        }
    }

    /// Returns the log lines. A missing file yields a single synthetic
    /// "created" line rather than an error.
    pub fn read(&self, kind: LogKind) -> Vec<String> {
        let path = match kind {
            LogKind::Main => &self.main_path,
            LogKind::Denied => &self.denied_path,
        };
        match fs::read_to_string(path) {
            Ok(content) => content.lines().map(|l| l.to_string()).collect(),
            Err(_) => vec![format!(
                "{} - INFO - Log file {} created",
                Local::now().format(TIMESTAMP_FORMAT),
                path.display()
            )],
        }
    }

    /// Truncates each log file not modified within the last 24 hours,
    /// replacing its content with a single marker line. Lossy retention,
    /// not rotation; errors are logged and ignored.
    pub fn clear_stale(&self) {
        self.clear_older_than(RETENTION);
    }

    fn clear_older_than(&self, retention: Duration) {
        for path in [&self.main_path, &self.denied_path] {
            if let Err(e) = clear_if_stale(path, retention) {
                warn!(path = %path.display(), error = %e, "failed to clear stale log");
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

fn clear_if_stale(path: &Path, retention: Duration) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let modified = fs::metadata(path)?.modified()?;
    let age = modified.elapsed().unwrap_or(Duration::ZERO);
    if age >= retention {
        let marker = format!(
            "{} - INFO - Log cleared\n",
            Local::now().format(TIMESTAMP_FORMAT)
        );
        fs::write(path, marker)?;
    }
    Ok(())
}
