use std::fs;
use std::path::Path;

use tracing::debug;
use wmi_domain::{
    is_representable, parse_comma_list, parse_names_file, EnvVarPair, Selection, ENV_WHITELIST,
};

use crate::core::config::EnvLookup;
use crate::core::errors::InjectError;

/// Resolves `selection` to names, then pairs each name with its current value.
///
/// Unset variables are left out. A value that is not single-line UTF-8 fails
/// the whole selection so the rendered file never depends on which variables
/// happened to be skipped.
pub fn select(
    selection: &Selection,
    lookup: &dyn EnvLookup,
) -> Result<Vec<EnvVarPair>, InjectError> {
    let names = resolve_names(selection)?;
    collect(&names, lookup)
}

/// Variable names named by `selection`, in selection order.
pub fn resolve_names(selection: &Selection) -> Result<Vec<String>, InjectError> {
    match selection {
        Selection::Whitelist => Ok(ENV_WHITELIST.iter().map(ToString::to_string).collect()),
        Selection::Explicit(list) => Ok(parse_comma_list(list)),
        Selection::File(path) => read_names_file(path),
    }
}

fn read_names_file(path: &Path) -> Result<Vec<String>, InjectError> {
    let contents = fs::read_to_string(path).map_err(|source| InjectError::SelectionSource {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_names_file(&contents))
}

fn collect(names: &[String], lookup: &dyn EnvLookup) -> Result<Vec<EnvVarPair>, InjectError> {
    let mut pairs = Vec::with_capacity(names.len());
    for name in names {
        let Some(raw) = lookup.lookup(name) else {
            debug!(variable = %name, "variable unset; omitted");
            continue;
        };
        let value = raw.into_string().map_err(|_| InjectError::Encoding {
            name: name.clone(),
            reason: "not valid UTF-8",
        })?;
        if !is_representable(&value) {
            return Err(InjectError::Encoding {
                name: name.clone(),
                reason: "contains a line break",
            });
        }
        pairs.push(EnvVarPair::new(name.as_str(), value));
    }
    Ok(pairs)
}

/// Whitelisted variables that are currently set.
pub fn get_whitelisted_env_vars(lookup: &dyn EnvLookup) -> Result<Vec<EnvVarPair>, InjectError> {
    select(&Selection::Whitelist, lookup)
}

/// Variables named in `env_file` that are currently set.
pub fn get_whitelisted_env_vars_with_file(
    env_file: &Path,
    lookup: &dyn EnvLookup,
) -> Result<Vec<EnvVarPair>, InjectError> {
    select(&Selection::File(env_file.to_path_buf()), lookup)
}

/// Variables named in a comma list that are currently set.
pub fn get_env_vars_from_comma_list(
    comma_list: &str,
    lookup: &dyn EnvLookup,
) -> Result<Vec<EnvVarPair>, InjectError> {
    select(&Selection::Explicit(comma_list.to_string()), lookup)
}
