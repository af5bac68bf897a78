//! File-backed power threshold.
//!
//! The tuning tool writes a single decimal number to a small file while the
//! live session reads it on every event. Writers replace the file in one
//! rename; readers fall back to a fixed value whenever the file is missing,
//! unreadable or out of range.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use neurograsp_core::translator::ThresholdSource;
use neurograsp_core::types::PowerThreshold;

/// Default threshold file, relative to the working directory.
pub const DEFAULT_THRESHOLD_FILE: &str = ".current_threshold";

/// Errors reading or writing the threshold file.
#[derive(Debug, Error)]
pub enum ThresholdFileError {
    /// File could not be read or written
    #[error("Threshold file {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// Contents are not a number in [0, 1]
    #[error("Threshold file {path} holds {content:?}, expected a number between 0 and 1")]
    Invalid {
        /// File involved
        path: PathBuf,
        /// Trimmed contents
        content: String,
    },
}

/// Threshold shared with an external tuning tool through a file.
#[derive(Clone, Debug)]
pub struct FileThreshold {
    path: PathBuf,
    fallback: PowerThreshold,
}

impl FileThreshold {
    /// Threshold read from `path`, or `fallback` when unavailable.
    pub fn new(path: impl Into<PathBuf>, fallback: PowerThreshold) -> Self {
        Self {
            path: path.into(),
            fallback,
        }
    }

    /// File being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value used when the file cannot be read.
    pub fn fallback(&self) -> PowerThreshold {
        self.fallback
    }

    /// Read the file strictly.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdFileError`] if the file is missing or invalid.
    pub fn read(&self) -> Result<PowerThreshold, ThresholdFileError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| ThresholdFileError::Io {
            path: self.path.clone(),
            source,
        })?;

        let content = raw.trim();
        content
            .parse::<f64>()
            .ok()
            .and_then(PowerThreshold::new)
            .ok_or_else(|| ThresholdFileError::Invalid {
                path: self.path.clone(),
                content: content.to_string(),
            })
    }

    /// Replace the stored value.
    ///
    /// Writes a sibling temp file and renames it over the target so a
    /// concurrent reader sees either the old or the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ThresholdFileError::Io`] on any filesystem failure.
    pub fn store(&self, value: PowerThreshold) -> Result<(), ThresholdFileError> {
        let io_err = |source| ThresholdFileError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        write!(file, "{}", value.value()).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(io_err)?;
        tracing::info!("Threshold set to {:.2} in {}", value.value(), self.path.display());
        Ok(())
    }
}

impl Default for FileThreshold {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_FILE, PowerThreshold::DEFAULT)
    }
}

impl ThresholdSource for FileThreshold {
    fn current(&self) -> PowerThreshold {
        match self.read() {
            Ok(threshold) => threshold,
            Err(ThresholdFileError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                self.fallback
            }
            Err(e) => {
                tracing::debug!("Using fallback threshold: {}", e);
                self.fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn threshold_in(dir: &TempDir) -> FileThreshold {
        FileThreshold::new(dir.path().join(DEFAULT_THRESHOLD_FILE), PowerThreshold::DEFAULT)
    }

    #[test]
    fn test_missing_file_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let threshold = threshold_in(&dir);

        assert!(threshold.read().is_err());
        assert_eq!(threshold.current(), PowerThreshold::DEFAULT);
    }

    #[test]
    fn test_store_then_current() {
        let dir = TempDir::new().unwrap();
        let threshold = threshold_in(&dir);

        threshold.store(PowerThreshold::new(0.7).unwrap()).unwrap();
        assert!((threshold.current().value() - 0.7).abs() < 1e-6);

        threshold.store(PowerThreshold::new(0.2).unwrap()).unwrap();
        assert!((threshold.current().value() - 0.2).abs() < 1e-6);
        assert!(!dir.path().join(".current_threshold.tmp").exists());
    }

    #[test]
    fn test_garbage_and_out_of_range_fall_back() {
        let dir = TempDir::new().unwrap();
        let threshold = threshold_in(&dir);

        for content in ["", "abc", "1.5", "-0.1", "NaN"] {
            fs::write(threshold.path(), content).unwrap();
            assert!(matches!(
                threshold.read(),
                Err(ThresholdFileError::Invalid { .. })
            ));
            assert_eq!(threshold.current(), PowerThreshold::DEFAULT);
        }
    }

    #[test]
    fn test_whitespace_tolerated() {
        let dir = TempDir::new().unwrap();
        let threshold = threshold_in(&dir);

        fs::write(threshold.path(), " 0.35\n").unwrap();
        assert!((threshold.current().value() - 0.35).abs() < 1e-6);
    }
}
