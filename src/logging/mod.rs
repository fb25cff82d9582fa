use std::{
    fmt::Write as _,
    fs::{self, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    thread,
};

use chrono::{format::DelayedFormat, Local};
use crossbeam_channel::{unbounded, Sender};
use once_cell::sync::OnceCell;

use crate::config::LogSettings;

static LOGGER: OnceCell<Logger> = OnceCell::new();

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn name(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

struct LogMessage {
    level: Level,
    msg: String,
}

pub struct Logger {
    writer: Sender<LogMessage>,
}

impl Logger {
    fn new(settings: &LogSettings) -> Option<Self> {
        let log_path = Self::get_log_path(Path::new(&settings.directory), &settings.name)?;
        let (tx, rx) = unbounded::<LogMessage>();

        // ファイルへの書き込みは別スレッドで行う
        thread::spawn(move || {
            let file = match OpenOptions::new().create(true).append(true).open(&log_path) {
                Ok(file) => file,
                Err(why) => {
                    error_console(format!("Failed to open log file {:?}: {}", log_path, why));
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut line = String::with_capacity(2048);

            for received in &rx {
                if writeln!(
                    &mut line,
                    "{} {} {}",
                    Local::now().format("%F %X%.6f"),
                    received.level.name(),
                    received.msg
                )
                .is_err()
                {
                    continue;
                }

                if rx.is_empty() || line.len() >= 2048 {
                    if let Err(why) = writer.write_all(line.as_bytes()) {
                        error_console(format!(
                            "Failed to write to log file. because:{:#?}\r\nmsg:{}",
                            why, line
                        ));
                    }

                    if let Err(why) = writer.flush() {
                        error_console(format!("Failed to flush log file. because:{:#?}", why));
                    }

                    line.clear();
                }
            }
        });

        Some(Logger { writer: tx })
    }

    fn send(&self, level: Level, msg: String) {
        if let Err(why) = self.writer.send(LogMessage { level, msg }) {
            error_console(why.to_string());
        }
    }

    fn get_log_path(directory: &Path, name: &str) -> Option<PathBuf> {
        if !directory.exists() {
            fs::create_dir_all(directory).ok()?;
        }

        let mut log_path = PathBuf::from(directory);
        log_path.push(format!("{}_{}.log", name, Local::now().format("%Y-%m-%d")));

        Some(log_path)
    }
}

/// Starts the file logger. Only the first call has an effect.
///
/// Returns whether file logging is active afterwards. Until this is called,
/// or when `settings.enabled` is false, every `*_file_async` call is dropped.
pub fn init(settings: &LogSettings) -> bool {
    if !settings.enabled {
        return LOGGER.get().is_some();
    }

    LOGGER
        .get_or_try_init(|| Logger::new(settings).ok_or(()))
        .is_ok()
}

fn log(level: Level, msg: String) {
    if let Some(logger) = LOGGER.get() {
        logger.send(level, msg);
    }
}

pub fn debug_file_async(log_msg: String) {
    log(Level::Debug, log_msg);
}

pub fn info_file_async(log_msg: String) {
    log(Level::Info, log_msg);
}

pub fn warn_file_async(log_msg: String) {
    log(Level::Warn, log_msg);
}

pub fn error_file_async(log_msg: String) {
    log(Level::Error, log_msg);
}

pub fn error_console(log_msg: String) {
    eprintln!(
        "{} Error {}",
        DelayedFormat::to_string(&Local::now().format("%Y-%m-%d %H:%M:%S.%3f")),
        log_msg
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_file_logger_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            enabled: true,
            directory: dir.path().join("log").to_string_lossy().into_owned(),
            name: "test".to_string(),
        };

        let logger = Logger::new(&settings).unwrap();
        logger.send(Level::Info, "GET:https://kabuyoho.jp/sp/reportTop?bcode=6758 200 OK 12 ms".to_string());
        logger.send(Level::Error, "boom".to_string());

        let path = Logger::get_log_path(Path::new(&settings.directory), "test").unwrap();
        let mut content = String::new();
        for _ in 0..50 {
            content = fs::read_to_string(&path).unwrap_or_default();
            if content.contains("boom") {
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }

        assert!(content.contains("INFO GET:https://kabuyoho.jp/sp/reportTop?bcode=6758"));
        assert!(content.contains("ERROR boom"));
    }

    #[test]
    fn test_disabled_init_is_a_no_op() {
        let settings = LogSettings::default();
        assert!(!settings.enabled);
        // 無効な設定では何も起動しない
        assert!(!init(&settings));
        info_file_async("dropped".to_string());
    }
}
