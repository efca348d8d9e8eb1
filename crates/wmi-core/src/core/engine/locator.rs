use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use wmi_domain::{WheelFilename, BUILD_ENV_FILENAME, DIST_INFO_SUFFIX, RECORD_FILENAME};
use zip::ZipArchive;

use crate::core::errors::InjectError;

pub(crate) type WheelReader = ZipArchive<BufReader<File>>;

/// Where the injector reads and writes inside one wheel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WheelLayout {
    pub path: PathBuf,
    /// Dist-info directory name without a trailing slash.
    pub dist_info_dir: String,
    pub metadata_path: String,
    pub record_path: String,
    /// A previous injection left a metadata entry behind.
    pub has_metadata: bool,
    pub entry_count: usize,
}

/// Inspects the wheel at `path` without decompressing any member.
pub fn locate_wheel(path: &Path) -> Result<WheelLayout, InjectError> {
    let mut archive = open_wheel(path)?;
    inspect_archive(path, &mut archive)
}

pub(crate) fn open_wheel(path: &Path) -> Result<WheelReader, InjectError> {
    let file = File::open(path).map_err(|err| InjectError::not_found(path, err))?;
    if file
        .metadata()
        .map_err(|err| InjectError::not_found(path, err))?
        .is_dir()
    {
        return Err(InjectError::invalid(path, "path is a directory"));
    }
    ZipArchive::new(BufReader::new(file))
        .map_err(|err| InjectError::invalid(path, format!("not a zip archive ({err})")))
}

pub(crate) fn inspect_archive<R: Read + Seek>(
    path: &Path,
    archive: &mut ZipArchive<R>,
) -> Result<WheelLayout, InjectError> {
    let names = entry_names(path, archive)?;
    let dist_info_dir = find_dist_info_dir(path, &names)?;
    let metadata_path = format!("{dist_info_dir}/{BUILD_ENV_FILENAME}");
    let record_path = format!("{dist_info_dir}/{RECORD_FILENAME}");

    if !names.iter().any(|name| name == &record_path) {
        return Err(InjectError::invalid(
            path,
            format!("{record_path} is missing"),
        ));
    }

    let has_metadata = names.iter().any(|name| name == &metadata_path);
    debug!(
        dist_info = %dist_info_dir,
        entries = names.len(),
        has_metadata,
        "located wheel metadata"
    );
    Ok(WheelLayout {
        path: path.to_path_buf(),
        dist_info_dir,
        metadata_path,
        record_path,
        has_metadata,
        entry_count: names.len(),
    })
}

/// Member names in archive order.
pub(crate) fn entry_names<R: Read + Seek>(
    path: &Path,
    archive: &mut ZipArchive<R>,
) -> Result<Vec<String>, InjectError> {
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive
            .by_index_raw(index)
            .map_err(|err| InjectError::invalid(path, format!("unreadable entry #{index} ({err})")))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}

/// Prefers the directory named after the wheel file and falls back to the
/// first top-level `*.dist-info` directory in archive order.
fn find_dist_info_dir(path: &Path, names: &[String]) -> Result<String, InjectError> {
    let mut candidates: Vec<&str> = Vec::new();
    for name in names {
        let Some((top, _)) = name.split_once('/') else {
            continue;
        };
        if top.len() > DIST_INFO_SUFFIX.len()
            && top.ends_with(DIST_INFO_SUFFIX)
            && !candidates.contains(&top)
        {
            candidates.push(top);
        }
    }

    if let Some(expected) = WheelFilename::from_path(path).map(|parsed| parsed.dist_info_dir()) {
        if let Some(found) = candidates
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(&expected))
        {
            return Ok((*found).to_string());
        }
    }

    match candidates.as_slice() {
        [] => Err(InjectError::invalid(path, "no .dist-info directory found")),
        [only] => Ok((*only).to_string()),
        [first, ..] => {
            debug!(
                chosen = %first,
                candidates = candidates.len(),
                "several dist-info directories; using the first"
            );
            Ok((*first).to_string())
        }
    }
}
