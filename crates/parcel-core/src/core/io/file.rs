use super::memory::ArchiveContents;
use super::traits::{Archive, ArchiveError, AttrValue};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// On-disk encodings supported by [`FileArchive`], chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Json,
    Toml,
}

impl ArchiveFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Some(ArchiveFormat::Json),
            Some("toml") => Some(ArchiveFormat::Toml),
            _ => None,
        }
    }
}

/// A file-backed archive.
///
/// The file is created (and truncated) when the archive is opened, so that an
/// unwritable location fails before any simulation work. Contents are buffered and
/// serialized on [`Archive::finish`]; if the archive is dropped unfinished (e.g. on an
/// error path) whatever has been recorded so far is flushed on a best-effort basis.
#[derive(Debug)]
pub struct FileArchive {
    path: PathBuf,
    format: ArchiveFormat,
    file: Option<File>,
    contents: ArchiveContents,
}

impl FileArchive {
    pub fn create(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        debug!("Creating archive {:?} ({:?})", path, format);
        let file = File::create(path).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            format,
            file: Some(file),
            contents: ArchiveContents::default(),
        })
    }

    /// Reads back an archive previously written by [`FileArchive`].
    pub fn read(path: &Path) -> Result<ArchiveContents, ArchiveError> {
        let format = ArchiveFormat::from_path(path).ok_or_else(|| ArchiveError::Serialization {
            path: path.to_path_buf(),
            message: "unsupported file extension".to_string(),
        })?;
        let content = std::fs::read_to_string(path).map_err(|e| ArchiveError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let parsed = match format {
            ArchiveFormat::Json => serde_json::from_str(&content).map_err(|e| e.to_string()),
            ArchiveFormat::Toml => toml::from_str(&content).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ArchiveError::Serialization {
            path: path.to_path_buf(),
            message,
        })
    }

    fn ensure_open(&self) -> Result<(), ArchiveError> {
        if self.file.is_some() {
            Ok(())
        } else {
            Err(ArchiveError::Finished)
        }
    }

    fn flush(&mut self) -> Result<(), ArchiveError> {
        let Some(file) = self.file.take() else {
            return Err(ArchiveError::Finished);
        };
        let serialization_error = |message: String| ArchiveError::Serialization {
            path: self.path.clone(),
            message,
        };
        let encoded = match self.format {
            ArchiveFormat::Json => serde_json::to_string_pretty(&self.contents)
                .map_err(|e| serialization_error(e.to_string()))?,
            ArchiveFormat::Toml => toml::to_string(&self.contents)
                .map_err(|e| serialization_error(e.to_string()))?,
        };
        let io_error = |e: std::io::Error| ArchiveError::Io {
            path: self.path.clone(),
            source: e,
        };
        let mut writer = BufWriter::new(file);
        writer.write_all(encoded.as_bytes()).map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        debug!(
            "Archive {:?} written with {} record(s)",
            self.path,
            self.contents.record_count()
        );
        Ok(())
    }
}

impl Archive for FileArchive {
    fn create_dimension(&mut self, name: &str, size: Option<usize>) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.create_dimension(name, size)
    }

    fn create_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        unit: &str,
        description: Option<&str>,
    ) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.create_variable(name, dims, unit, description)
    }

    fn write(&mut self, name: &str, index: &[usize], value: f64) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.write(name, index, value)
    }

    fn write_slice(&mut self, name: &str, values: &[f64]) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.write_slice(name, values)
    }

    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ArchiveError> {
        self.ensure_open()?;
        self.contents.attributes.insert(name.to_string(), value);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        self.flush()
    }
}

impl Drop for FileArchive {
    fn drop(&mut self) {
        if self.file.is_some() {
            if let Err(e) = self.flush() {
                warn!("Failed to flush unfinished archive {:?}: {}", self.path, e);
            }
        }
    }
}
