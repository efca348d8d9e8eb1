use std::path::Path;

use crate::DIST_INFO_SUFFIX;

/// The name and version segments of `{name}-{version}(-{build})?-{py}-{abi}-{plat}.whl`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WheelFilename {
    pub name: String,
    pub version: String,
}

impl WheelFilename {
    /// Parses the file name of `path`; returns `None` for non-wheel names.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        if !path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("whl"))
        {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let parts: Vec<&str> = stem.split('-').collect();
        if !(5..=6).contains(&parts.len()) || parts.iter().any(|part| part.is_empty()) {
            return None;
        }
        Some(Self {
            name: parts[0].to_string(),
            version: parts[1].to_string(),
        })
    }

    /// The dist-info directory a conforming wheel with this name would carry.
    #[must_use]
    pub fn dist_info_dir(&self) -> String {
        format!("{}-{}{DIST_INFO_SUFFIX}", self.name, self.version)
    }
}
