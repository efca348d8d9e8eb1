use std::path::PathBuf;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Variables recorded when the caller does not name any.
pub const ENV_WHITELIST: &[&str] = &[
    // PyTorch/CUDA
    "TORCH_CUDA_ARCH_LIST",
    "CUDA_VERSION",
    "CUDA_HOME",
    "CUDNN_VERSION",
    "BUILD_TYPE",
    "PYTORCH_BUILD_VERSION",
    "PYTORCH_BUILD_NUMBER",
    "CMAKE_ARGS",
    "EXTRA_CAFFE2_CMAKE_FLAGS",
    // ROCm
    "PYTORCH_ROCM_ARCH",
    "GPU_ARCHS",
    // GitHub Actions
    "GITHUB_SHA",
    "GITHUB_REPOSITORY",
    "GITHUB_WORKFLOW",
    "GITHUB_JOB",
    "GITHUB_RUN_ID",
    "RUNNER_OS",
    "RUNNER_ARCH",
    // Toolchain
    "CMAKE_BUILD_TYPE",
    "PYTHON_VERSION",
    "SETUPTOOLS_VERSION",
    "PIP_VERSION",
    "CC",
    "CXX",
    "CFLAGS",
    "CXXFLAGS",
    "LDFLAGS",
];

/// One captured environment variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarPair {
    pub name: String,
    pub value: String,
}

impl EnvVarPair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<(&str, &str)> for EnvVarPair {
    fn from((name, value): (&str, &str)) -> Self {
        Self::new(name, value)
    }
}

/// Where the variable names for one injection come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// The built-in [`ENV_WHITELIST`].
    #[default]
    Whitelist,
    /// A comma-separated list such as `"CUDA_HOME, CC"`.
    Explicit(String),
    /// A file with one variable name per line.
    File(PathBuf),
}

impl Selection {
    /// Picks a single source, preferring an explicit list over a file over the
    /// whitelist. Sources are never merged.
    #[must_use]
    pub fn from_sources(env_vars: Option<String>, env_file: Option<PathBuf>) -> Self {
        match (env_vars, env_file) {
            (Some(list), _) => Self::Explicit(list),
            (None, Some(path)) => Self::File(path),
            (None, None) => Self::Whitelist,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Whitelist => "default whitelist".to_string(),
            Self::Explicit(list) => format!("inline list `{list}`"),
            Self::File(path) => format!("names file {}", path.display()),
        }
    }
}

/// Splits a comma list into trimmed, non-empty names.
#[must_use]
pub fn parse_comma_list(list: &str) -> Vec<String> {
    let names = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string);
    dedupe_names(names)
}

/// Reads one name per line; blank lines and `#` comments are skipped.
#[must_use]
pub fn parse_names_file(contents: &str) -> Vec<String> {
    let names = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string);
    dedupe_names(names)
}

/// Drops repeated names, keeping the first occurrence.
pub fn dedupe_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    names
        .into_iter()
        .collect::<IndexSet<String>>()
        .into_iter()
        .collect()
}
