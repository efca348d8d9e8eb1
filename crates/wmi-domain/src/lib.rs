//! Data model shared by the wheel metadata injector: environment selections,
//! the `WHEEL.metadata` format, and the wheel `RECORD` manifest.

pub mod env;
pub mod filename;
pub mod metadata;
pub mod record;

pub use env::{
    dedupe_names, parse_comma_list, parse_names_file, EnvVarPair, Selection, ENV_WHITELIST,
};
pub use filename::WheelFilename;
pub use metadata::{decode_metadata, encode_metadata, is_representable, BUILD_ENV_FILENAME};
pub use record::{record_digest, DigestCheck, Record, RecordLine, RECORD_FILENAME};

/// Suffix shared by every wheel metadata directory.
pub const DIST_INFO_SUFFIX: &str = ".dist-info";
