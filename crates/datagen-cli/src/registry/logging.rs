use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;

use super::{RegistryError, RegistryResult};

/// Handle on a run's `logs.ndjson`, cloned once per event by the subscriber.
#[derive(Clone)]
struct RunLog(Arc<Mutex<File>>);

impl RunLog {
    fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self(Arc::new(Mutex::new(file))))
    }

    fn with_file<T>(&self, action: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut file = self
            .0
            .lock()
            .map_err(|_| io::Error::other("run log lock poisoned"))?;
        action(&mut file)
    }
}

impl Write for RunLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_file(|file| file.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_file(|file| file.flush())
    }
}

/// JSON events for one generate run, appended to `path`.
pub fn init_run_logging(path: &Path, default_level: &str) -> RegistryResult<()> {
    let log = RunLog::open(path)?;
    let events = tracing_subscriber::fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(true)
        .with_writer(move || log.clone());

    tracing_subscriber::registry()
        .with(level_filter(default_level))
        .with(events)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

/// Plain events on stderr for commands that do not create a run.
pub fn init_console_logging(default_level: &str) -> RegistryResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(level_filter(default_level))
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| RegistryError::Logging(err.to_string()))
}

/// `RUST_LOG` wins over the configured level.
fn level_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_append_to_the_same_file() {
        let path = std::env::temp_dir().join(format!("datagen-runlog-{}.ndjson", std::process::id()));
        std::fs::remove_file(&path).ok();
        let mut first = RunLog::open(&path).expect("open");
        let mut second = first.clone();
        first.write_all(b"{\"a\":1}\n").expect("write");
        second.write_all(b"{\"b\":2}\n").expect("write");
        second.flush().expect("flush");
        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content.lines().count(), 2);
        std::fs::remove_file(&path).ok();
    }
}
