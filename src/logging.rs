use crate::error::AppError;
use chrono::Local;
use log::{LevelFilter, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

// The TUI owns stdout/stderr while the alternate screen is active, so all
// diagnostics go to a file instead.
pub struct FileLogger {
    file: Mutex<File>,
    max_level: LevelFilter,
}

impl FileLogger {
    pub fn new(log_path: &Path, max_level: LevelFilter) -> Result<Self, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;
        Ok(Self {
            file: Mutex::new(file),
            max_level,
        })
    }
}

impl log::Log for FileLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut file = self.file.lock();
        let _ = writeln!(
            file,
            "{} [{}] {}: {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let mut file = self.file.lock();
        let _ = file.flush();
    }
}

pub fn init(log_path: &Path, debug: bool) -> Result<(), AppError> {
    let max_level = if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let logger = FileLogger::new(log_path, max_level)?;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(max_level);
    Ok(())
}
