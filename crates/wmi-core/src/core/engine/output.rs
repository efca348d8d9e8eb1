use std::fs::{self, File, Permissions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::core::errors::InjectError;

/// Where the rewritten archive ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Replace the source wheel.
    InPlace,
    /// Leave the source alone and write a separate file.
    Target(PathBuf),
}

impl OutputPolicy {
    /// An output equal to the source path is treated as in-place.
    #[must_use]
    pub fn resolve(source: &Path, output: Option<&Path>) -> Self {
        match output {
            Some(path) if !same_path(source, path) => Self::Target(path.to_path_buf()),
            _ => Self::InPlace,
        }
    }

    #[must_use]
    pub fn destination(&self, source: &Path) -> PathBuf {
        match self {
            Self::InPlace => source.to_path_buf(),
            Self::Target(path) => path.clone(),
        }
    }

    #[must_use]
    pub fn is_in_place(&self) -> bool {
        matches!(self, Self::InPlace)
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// A temporary file beside the destination that becomes the destination on
/// [`StagedOutput::commit`]. Dropping it without committing removes it.
pub struct StagedOutput {
    tmp: NamedTempFile,
    destination: PathBuf,
}

impl StagedOutput {
    pub fn create(destination: &Path) -> Result<Self, InjectError> {
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let stem = destination
            .file_name()
            .map_or_else(|| "wheel".to_string(), |name| name.to_string_lossy().into_owned());
        let tmp = tempfile::Builder::new()
            .prefix(&format!(".{stem}."))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|err| InjectError::write(destination, err))?;
        debug!(staging = %tmp.path().display(), "staging output");
        Ok(Self {
            tmp,
            destination: destination.to_path_buf(),
        })
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Buffered writer over the staged file.
    pub fn writer(&mut self) -> BufWriter<&mut File> {
        BufWriter::new(self.tmp.as_file_mut())
    }

    /// Hex sha256 and size of everything written so far.
    pub fn digest(&self) -> Result<(String, u64), InjectError> {
        let mut file = self
            .tmp
            .reopen()
            .map_err(|err| InjectError::write(&self.destination, err))?;
        let mut hasher = Sha256::new();
        let size = io::copy(&mut file, &mut hasher)
            .map_err(|err| InjectError::write(&self.destination, err))?;
        Ok((hex::encode(hasher.finalize()), size))
    }

    /// Applies `permissions`, syncs the staged file to disk, then renames it
    /// over the destination.
    pub fn commit(self, permissions: Option<Permissions>) -> Result<PathBuf, InjectError> {
        let Self { tmp, destination } = self;
        if let Some(permissions) = permissions {
            fs::set_permissions(tmp.path(), permissions)
                .map_err(|err| InjectError::write(&destination, err))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|err| InjectError::write(&destination, err))?;
        tmp.persist(&destination)
            .map_err(|err| InjectError::write(&destination, err.error))?;
        Ok(destination)
    }
}
