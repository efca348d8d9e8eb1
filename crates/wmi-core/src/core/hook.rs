use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};
use wmi_domain::{EnvVarPair, Selection};

use crate::core::config::{Config, EnvLookup};
use crate::core::errors::InjectError;
use crate::core::process::{process_wheel_with, InjectRequest};

/// Per-build options a packaging backend passes to the hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookOptions {
    pub skip: bool,
    pub env_file: Option<PathBuf>,
    pub env_vars: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HookOutcome {
    Skipped,
    NoWheel { pattern: String },
    Injected {
        path: PathBuf,
        variables: Vec<EnvVarPair>,
    },
}

/// Injects metadata into the wheel a build just wrote to `dist_dir`.
///
/// The wheel is the first `<dist_name>*.whl` in lexical order and is
/// rewritten in place. An explicit list beats a names file; without either
/// the default names file from `config`, then the whitelist, is used.
pub fn inject_built_wheel(
    dist_dir: &Path,
    dist_name: &str,
    options: &HookOptions,
    config: &Config,
    lookup: &dyn EnvLookup,
) -> Result<HookOutcome, InjectError> {
    if options.skip || config.skip_injection {
        info!("metadata injection skipped");
        return Ok(HookOutcome::Skipped);
    }

    let pattern = format!("{dist_name}*.whl");
    let Some(wheel) = find_built_wheel(dist_dir, dist_name) else {
        warn!(dir = %dist_dir.display(), %pattern, "no built wheel found");
        return Ok(HookOutcome::NoWheel { pattern });
    };

    let selection = Selection::from_sources(
        options.env_vars.clone(),
        options
            .env_file
            .clone()
            .or_else(|| config.default_env_file.clone()),
    );
    let report = process_wheel_with(&InjectRequest::new(wheel, selection), lookup)?;
    Ok(HookOutcome::Injected {
        path: report.path,
        variables: report.variables,
    })
}

fn find_built_wheel(dist_dir: &Path, dist_name: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(dist_dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(dist_name) && name.ends_with(".whl"))
        })
        .collect();
    matches.sort();
    matches.into_iter().next()
}
