use crate::env::EnvVarPair;

/// Name of the injected file inside the dist-info directory.
pub const BUILD_ENV_FILENAME: &str = "WHEEL.metadata";

const SEPARATOR: &str = ": ";

/// Renders pairs as `NAME: VALUE\n` lines in the given order.
///
/// An empty slice renders to an empty buffer; the caller still writes the
/// file so readers can tell an injection ran.
#[must_use]
pub fn encode_metadata(pairs: &[EnvVarPair]) -> Vec<u8> {
    let mut body = String::new();
    for pair in pairs {
        body.push_str(&pair.name);
        body.push_str(SEPARATOR);
        body.push_str(&pair.value);
        body.push('\n');
    }
    body.into_bytes()
}

/// Parses a `WHEEL.metadata` body back into pairs.
///
/// Lines without a `": "` separator are ignored. A name may not contain the
/// separator, so the first occurrence splits name from value.
#[must_use]
pub fn decode_metadata(body: &str) -> Vec<EnvVarPair> {
    body.lines()
        .filter_map(|line| {
            let (name, value) = line.split_once(SEPARATOR)?;
            Some(EnvVarPair::new(name, value))
        })
        .collect()
}

/// Whether a value can be stored on a single metadata line.
#[must_use]
pub fn is_representable(value: &str) -> bool {
    !value.contains(['\n', '\r'])
}
