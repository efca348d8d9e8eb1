//! The injection pipeline: select variables, locate the dist-info directory,
//! rewrite the archive, and commit it to its destination.

pub mod locator;
pub mod output;
pub mod rewriter;
pub mod selector;

pub use locator::{locate_wheel, WheelLayout};
pub use output::{OutputPolicy, StagedOutput};
pub use rewriter::{ArchiveRewriter, RewriteStats};
pub use selector::{
    get_env_vars_from_comma_list, get_whitelisted_env_vars, get_whitelisted_env_vars_with_file,
    resolve_names, select,
};
