use std::io;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use zip::result::ZipError;

/// Failures that abort one injection. None of them leave a partial archive behind.
#[derive(Debug, thiserror::Error)]
pub enum InjectError {
    #[error("wheel {} does not exist or cannot be read: {source}", path.display())]
    ArchiveNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} is not a valid wheel: {reason}", path.display())]
    InvalidWheel { path: PathBuf, reason: String },
    #[error("unable to read variable names from {}: {source}", path.display())]
    SelectionSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unable to write {}: {source}", path.display())]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("value of {name} cannot be written to WHEEL.metadata ({reason})")]
    Encoding { name: String, reason: &'static str },
}

impl InjectError {
    pub(crate) fn not_found(path: &Path, source: io::Error) -> Self {
        Self::ArchiveNotFound {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid(path: &Path, reason: impl Into<String>) -> Self {
        Self::InvalidWheel {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::ArchiveWrite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write_zip(path: &Path, err: ZipError) -> Self {
        Self::write(path, zip_to_io(err))
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ArchiveNotFound { .. } => "WMI101",
            Self::InvalidWheel { .. } => "WMI102",
            Self::SelectionSource { .. } => "WMI110",
            Self::ArchiveWrite { .. } => "WMI120",
            Self::Encoding { .. } => "WMI130",
        }
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ArchiveNotFound { .. } => "archive_not_found",
            Self::InvalidWheel { .. } => "invalid_wheel",
            Self::SelectionSource { .. } => "selection_source_unreadable",
            Self::ArchiveWrite { .. } => "archive_write_failed",
            Self::Encoding { .. } => "value_not_encodable",
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ArchiveNotFound { .. } => Some("Check the wheel path; build the wheel first."),
            Self::InvalidWheel { .. } => {
                Some("Pass a .whl produced by a build backend (it needs a *.dist-info/RECORD).")
            }
            Self::SelectionSource { .. } => {
                Some("Point --env-file at a readable file with one variable name per line.")
            }
            Self::ArchiveWrite { .. } => {
                Some("Check that the destination directory exists, is writable, and has free space.")
            }
            Self::Encoding { .. } => {
                Some("Unset the variable or drop it from the selection; values must be single-line UTF-8.")
            }
        }
    }

    /// Structured payload used by JSON output.
    #[must_use]
    pub fn details(&self) -> Value {
        let mut details = json!({
            "code": self.code(),
            "reason": self.reason(),
        });
        if let Value::Object(map) = &mut details {
            if let Some(hint) = self.hint() {
                map.insert("hint".into(), json!(hint));
            }
            match self {
                Self::ArchiveNotFound { path, .. }
                | Self::InvalidWheel { path, .. }
                | Self::ArchiveWrite { path, .. } => {
                    map.insert("path".into(), json!(path.display().to_string()));
                }
                Self::SelectionSource { path, .. } => {
                    map.insert("env_file".into(), json!(path.display().to_string()));
                }
                Self::Encoding { name, .. } => {
                    map.insert("variable".into(), json!(name));
                }
            }
        }
        details
    }
}

fn zip_to_io(err: ZipError) -> io::Error {
    match err {
        ZipError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
