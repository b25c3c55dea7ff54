//! Hardware error types

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while talking to an LED class device
#[derive(Error, Debug)]
pub enum HardwareError {
    /// A device file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device file could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device file was readable but its content made no sense
    #[error("Unparsable value in {path}: {value:?}")]
    Parse { path: PathBuf, value: String },

    /// The hardware reported a state the driver cannot represent
    #[error("Invalid hardware state: {0}")]
    InvalidState(String),
}

impl HardwareError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HardwareError::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HardwareError::Write {
            path: path.into(),
            source,
        }
    }
}
