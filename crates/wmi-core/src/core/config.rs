use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const SKIP_ENV: &str = "WHEEL_METADATA_INJECTOR_SKIP";
pub const ENV_FILE_ENV: &str = "WHEEL_METADATA_INJECTOR_ENV_FILE";

/// Source of environment variable values.
///
/// The selector only ever reads through this trait, so callers decide whether
/// values come from the live process, a captured snapshot, or a test fixture.
pub trait EnvLookup {
    fn lookup(&self, name: &str) -> Option<OsString>;
}

impl<F> EnvLookup for F
where
    F: Fn(&str) -> Option<OsString>,
{
    fn lookup(&self, name: &str) -> Option<OsString> {
        self(name)
    }
}

/// Reads the live process environment on every lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, name: &str) -> Option<OsString> {
        env::var_os(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, OsString>,
}

impl EnvSnapshot {
    #[must_use]
    pub fn capture() -> Self {
        Self {
            vars: env::vars_os()
                .filter_map(|(key, value)| key.into_string().ok().map(|key| (key, value)))
                .collect(),
        }
    }

    #[must_use]
    pub fn flag_is_enabled(&self, key: &str) -> bool {
        self.var(key).is_some_and(|value| {
            matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    #[must_use]
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).and_then(|value| value.to_str())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), OsString::from(*v)))
            .collect();
        Self { vars }
    }

    #[cfg(test)]
    pub(crate) fn insert_os(&mut self, key: &str, value: OsString) {
        self.vars.insert(key.to_string(), value);
    }
}

impl EnvLookup for EnvSnapshot {
    fn lookup(&self, name: &str) -> Option<OsString> {
        self.vars.get(name).cloned()
    }
}

/// Settings read from the environment of the process driving the injector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Build hooks return without touching the wheel.
    pub skip_injection: bool,
    /// Names file the build hook falls back to when no list or file is given.
    pub default_env_file: Option<PathBuf>,
}

impl Config {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_snapshot(&EnvSnapshot::capture())
    }

    #[must_use]
    pub fn from_snapshot(snapshot: &EnvSnapshot) -> Self {
        Self {
            skip_injection: snapshot.flag_is_enabled(SKIP_ENV),
            default_env_file: snapshot
                .var(ENV_FILE_ENV)
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from),
        }
    }
}

/// Options shared by every CLI invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
}
