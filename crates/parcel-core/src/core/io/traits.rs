use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A value stored as an archive-level attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        AttrValue::Bool(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

impl From<usize> for AttrValue {
    fn from(v: usize) -> Self {
        AttrValue::Int(v as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        AttrValue::Text(v.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        AttrValue::Text(v)
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Dimension '{0}' already exists")]
    DuplicateDimension(String),

    #[error("Variable '{0}' already exists")]
    DuplicateVariable(String),

    #[error("Unknown dimension '{dimension}' for variable '{variable}'")]
    UnknownDimension { variable: String, dimension: String },

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Only the first dimension of '{0}' may be unlimited")]
    MisplacedUnlimited(String),

    #[error("Index {index:?} does not match the shape {shape:?} of variable '{variable}'")]
    IndexOutOfBounds {
        variable: String,
        index: Vec<usize>,
        shape: Vec<Option<usize>>,
    },

    #[error("Slice of length {given} does not fit variable '{variable}' of length {expected}")]
    SliceLength {
        variable: String,
        expected: usize,
        given: usize,
    },

    #[error("Archive has already been finished")]
    Finished,

    #[error("File I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize archive '{path}': {message}", path = path.display())]
    Serialization { path: PathBuf, message: String },
}

/// The time-series archive contract used by the diagnostics layer.
///
/// Mirrors a self-describing array format: named dimensions (the first of which may be
/// unlimited), variables defined over dimensions, and free-form global attributes.
pub trait Archive {
    /// Declares a dimension; `None` makes it unlimited (it grows as records are written).
    fn create_dimension(&mut self, name: &str, size: Option<usize>) -> Result<(), ArchiveError>;

    /// Declares a variable over previously declared dimensions.
    fn create_variable(
        &mut self,
        name: &str,
        dims: &[&str],
        unit: &str,
        description: Option<&str>,
    ) -> Result<(), ArchiveError>;

    /// Writes a single element at a multi-dimensional index.
    fn write(&mut self, name: &str, index: &[usize], value: f64) -> Result<(), ArchiveError>;

    /// Writes the whole content of a fixed-size one-dimensional variable.
    fn write_slice(&mut self, name: &str, values: &[f64]) -> Result<(), ArchiveError>;

    /// Sets (or replaces) a global attribute.
    fn set_attribute(&mut self, name: &str, value: AttrValue) -> Result<(), ArchiveError>;

    /// Flushes and closes the archive. Further writes fail with [`ArchiveError::Finished`].
    fn finish(&mut self) -> Result<(), ArchiveError>;
}
