//! Rolling Logger
//!
//! File logging for desktop/CLI hosts:
//! - writes `<dir>/<app>.log`, rotating to a timestamped file past a size limit
//! - keeps at most `max_files` rotated files
//! - holds the most recent lines in memory for in-app log views
//!
//! `init_logger` installs a global `tracing` subscriber that also captures
//! records sent through the `log` facade.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, MutexGuard};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Logger I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to install subscriber: {0}")]
    Install(String),
    #[error("Logger not initialized")]
    NotInitialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerConfig {
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub buffer_lines: usize,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024,
            max_files: 5,
            buffer_lines: 500,
        }
    }
}

struct RollingState {
    file: File,
    written: u64,
    recent: VecDeque<String>,
    partial: String,
}

/// Size-rotated log file plus a circular buffer of recent lines
pub struct RollingFile {
    dir: PathBuf,
    app_name: String,
    config: LoggerConfig,
    state: Mutex<RollingState>,
}

impl RollingFile {
    pub fn open(dir: impl AsRef<Path>, app_name: &str, config: LoggerConfig) -> Result<Self, LoggerError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}.log", app_name));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir,
            app_name: app_name.to_string(),
            config,
            state: Mutex::new(RollingState {
                file,
                written,
                recent: VecDeque::with_capacity(config.buffer_lines),
                partial: String::new(),
            }),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.log", self.app_name))
    }

    /// Last lines written, oldest first
    pub fn recent_lines(&self) -> Vec<String> {
        self.lock().recent.iter().cloned().collect()
    }

    /// Rotated files, oldest first
    pub fn rotated_files(&self) -> io::Result<Vec<PathBuf>> {
        let prefix = format!("{}-", self.app_name);
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".log"))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn lock(&self) -> MutexGuard<'_, RollingState> {
        self.state.lock()
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.written > 0 && state.written + buf.len() as u64 > self.config.max_file_bytes {
            self.rotate(&mut state)?;
        }
        state.file.write_all(buf)?;
        state.written += buf.len() as u64;
        self.remember(&mut state, buf);
        Ok(())
    }

    fn remember(&self, state: &mut RollingState, buf: &[u8]) {
        if self.config.buffer_lines == 0 {
            return;
        }
        state.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = state.partial.find('\n') {
            let line: String = state.partial.drain(..=pos).collect();
            if state.recent.len() == self.config.buffer_lines {
                state.recent.pop_front();
            }
            state.recent.push_back(line.trim_end().to_string());
        }
    }

    fn rotate(&self, state: &mut RollingState) -> io::Result<()> {
        state.file.flush()?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let mut n = 0;
        let mut target = self.dir.join(format!("{}-{}-{:03}.log", self.app_name, stamp, n));
        while target.exists() {
            n += 1;
            target = self.dir.join(format!("{}-{}-{:03}.log", self.app_name, stamp, n));
        }
        fs::rename(self.path(), &target)?;
        state.file = OpenOptions::new().create(true).append(true).open(self.path())?;
        state.written = 0;

        let rotated = self.rotated_files()?;
        let excess = rotated.len().saturating_sub(self.config.max_files);
        for old in rotated.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&old) {
                self.warn_locked(state, &format!("failed to prune {}: {}", old.display(), e))?;
            }
        }
        Ok(())
    }

    /// Write a WARN record straight to the file; the subscriber cannot be
    /// re-entered while the state lock is held.
    fn warn_locked(&self, state: &mut RollingState, message: &str) -> io::Result<()> {
        let line = format!(
            "{}  WARN rolling_logger: {}\n",
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            message
        );
        state.file.write_all(line.as_bytes())?;
        state.written += line.len() as u64;
        self.remember(state, line.as_bytes());
        Ok(())
    }
}

/// Cloneable writer handle handed to the fmt subscriber
#[derive(Clone)]
pub struct RollingWriter(Arc<RollingFile>);

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

static LOGGER: OnceLock<Arc<RollingFile>> = OnceLock::new();

/// Install the global logger writing to `<dir>/<app_name>.log`
pub fn init_logger(dir: impl AsRef<Path>, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(dir, app_name, LoggerConfig::default())
}

pub fn init_logger_with(dir: impl AsRef<Path>, app_name: &str, config: LoggerConfig) -> Result<(), LoggerError> {
    let file = Arc::new(RollingFile::open(dir, app_name, config)?);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(RollingWriter(Arc::clone(&file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| LoggerError::Install(e.to_string()))?;

    let path = file.path();
    let _ = LOGGER.set(file);
    // Goes through the log -> tracing bridge installed by `try_init`
    log::info!("[logger] {} writing to {}", app_name, path.display());
    Ok(())
}

fn installed() -> Result<&'static Arc<RollingFile>, LoggerError> {
    LOGGER.get().ok_or(LoggerError::NotInitialized)
}

pub fn info(message: &str) -> Result<(), LoggerError> {
    installed()?;
    tracing::info!("{}", message);
    Ok(())
}

pub fn warn(message: &str) -> Result<(), LoggerError> {
    installed()?;
    tracing::warn!("{}", message);
    Ok(())
}

pub fn error(message: &str) -> Result<(), LoggerError> {
    installed()?;
    tracing::error!("{}", message);
    Ok(())
}

/// Recent lines of the global logger, oldest first
pub fn recent_lines() -> Result<Vec<String>, LoggerError> {
    Ok(installed()?.recent_lines())
}
