#![deny(clippy::all)]

mod core;

pub mod engine {
    pub use crate::core::engine::*;
}

pub use crate::core::config::{
    Config, EnvLookup, EnvSnapshot, GlobalOptions, ProcessEnv, ENV_FILE_ENV, SKIP_ENV,
};
pub use crate::core::engine::{
    get_env_vars_from_comma_list, get_whitelisted_env_vars, get_whitelisted_env_vars_with_file,
    locate_wheel, WheelLayout,
};
pub use crate::core::errors::InjectError;
pub use crate::core::hook::{inject_built_wheel, HookOptions, HookOutcome};
pub use crate::core::inspect::{
    read_injected_metadata, verify_wheel, InjectedMetadata, RecordIssue, VariableCheck,
    VariableStatus, VerifyReport,
};
pub use crate::core::outcome::{CommandStatus, ExecutionOutcome};
pub use crate::core::process::{
    inject_variables, process_wheel, process_wheel_with, process_wheel_with_env_file,
    process_wheel_with_env_vars, InjectReport, InjectRequest,
};

pub use wmi_domain::{EnvVarPair, Selection, ENV_WHITELIST};
