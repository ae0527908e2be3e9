//! Mission log — durable, append-only event trail.
//!
//! Events accumulate in memory and the whole sequence is flushed to disk
//! after every iteration, so a crash loses at most the in-flight step.
//! Once the persisted file outgrows the threshold it is gzip-compressed
//! in place; reads handle both forms transparently.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use overwatch_core::error::MissionError;
use overwatch_core::mission::MissionLogEvent;
use tracing::{debug, info, warn};

/// Persisted log size beyond which the file is compressed, in bytes.
pub const COMPRESS_THRESHOLD: u64 = 50 * 1024;

/// The append-only mission log.
pub struct MissionLog {
    path: PathBuf,
    events: Vec<MissionLogEvent>,
}

impl MissionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), events: Vec::new() }
    }

    pub fn events(&self) -> &[MissionLogEvent] {
        &self.events
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn gz_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".gz");
        PathBuf::from(name)
    }

    /// Append one event. Durability comes from the following `flush`.
    pub fn append(&mut self, event: MissionLogEvent) {
        self.events.push(event);
    }

    /// Write the full event sequence to disk, compressing in place once
    /// the plain file crosses the threshold. Returns the path actually
    /// written.
    pub fn flush(&self) -> Result<PathBuf, MissionError> {
        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source: std::io::Error| MissionError::Io { path: path.clone(), source }
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err(&self.path))?;
        }

        let json = serde_json::to_vec_pretty(&self.events).map_err(|e| MissionError::Io {
            path: self.path.display().to_string(),
            source: std::io::Error::other(e),
        })?;

        let gz_path = self.gz_path();
        let compressed_already = gz_path.exists();

        if compressed_already || json.len() as u64 > COMPRESS_THRESHOLD {
            let file = File::create(&gz_path).map_err(io_err(&gz_path))?;
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(&json).map_err(io_err(&gz_path))?;
            encoder.finish().map_err(io_err(&gz_path))?.flush().map_err(io_err(&gz_path))?;

            if self.path.exists() {
                std::fs::remove_file(&self.path).map_err(io_err(&self.path))?;
                info!(path = %gz_path.display(), "Mission log compressed in place");
            }
            debug!(events = self.events.len(), path = %gz_path.display(), "Mission log flushed");
            Ok(gz_path)
        } else {
            let mut file = File::create(&self.path).map_err(io_err(&self.path))?;
            file.write_all(&json).map_err(io_err(&self.path))?;
            file.flush().map_err(io_err(&self.path))?;
            debug!(events = self.events.len(), path = %self.path.display(), "Mission log flushed");
            Ok(self.path.clone())
        }
    }

    /// Read a persisted log, compressed or not.
    pub fn load(path: &Path) -> Result<Vec<MissionLogEvent>, MissionError> {
        let mut gz = path.as_os_str().to_os_string();
        gz.push(".gz");
        let gz_path = PathBuf::from(gz);

        let json = if gz_path.exists() {
            let file = File::open(&gz_path).map_err(|e| MissionError::Io {
                path: gz_path.display().to_string(),
                source: e,
            })?;
            let mut decoder = GzDecoder::new(file);
            let mut out = String::new();
            decoder.read_to_string(&mut out).map_err(|e| MissionError::Io {
                path: gz_path.display().to_string(),
                source: e,
            })?;
            out
        } else {
            std::fs::read_to_string(path).map_err(|e| MissionError::Io {
                path: path.display().to_string(),
                source: e,
            })?
        };

        serde_json::from_str(&json).map_err(|e| {
            warn!(path = %path.display(), error = %e, "Mission log did not parse");
            MissionError::Io {
                path: path.display().to_string(),
                source: std::io::Error::other(e),
            }
        })
    }
}
