//! The wheel `RECORD` manifest: one `path,hash,size` CSV row per archive member.
//!
//! Rows that are not touched by an edit are kept as their original text so a
//! rewritten manifest differs from the source only where it has to.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use sha2::{Digest, Sha256, Sha384, Sha512};

pub const RECORD_FILENAME: &str = "RECORD";

/// A single manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLine {
    pub path: String,
    pub hash: Option<String>,
    pub size: Option<u64>,
    raw: String,
}

impl RecordLine {
    /// Builds a row for a member that is listed without hash or size.
    #[must_use]
    pub fn unhashed(path: &str) -> Self {
        Self {
            path: path.to_string(),
            hash: None,
            size: None,
            raw: render_row([path, "", ""]),
        }
    }

    /// Builds a hashed row for `data`.
    #[must_use]
    pub fn hashed(path: &str, data: &[u8]) -> Self {
        let hash = record_digest(data);
        Self {
            path: path.to_string(),
            raw: render_row([path, &hash, &data.len().to_string()]),
            hash: Some(hash),
            size: Some(data.len() as u64),
        }
    }

    fn parse(line: &str) -> Self {
        let (path, hash, size) = split_fields(line);
        Self {
            path,
            hash: hash.filter(|h| !h.is_empty()),
            size: size.and_then(|s| s.trim().parse().ok()),
            raw: line.to_string(),
        }
    }

    /// The row exactly as it appears in the manifest, without a line ending.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Checks `data` against the recorded digest and size.
    #[must_use]
    pub fn check(&self, data: &[u8]) -> DigestCheck {
        let Some(hash) = &self.hash else {
            return DigestCheck::Unhashed;
        };
        if let Some(size) = self.size {
            if size != data.len() as u64 {
                return DigestCheck::SizeMismatch {
                    expected: size,
                    actual: data.len() as u64,
                };
            }
        }
        let Some((algorithm, _)) = hash.split_once('=') else {
            return DigestCheck::UnsupportedAlgorithm(hash.clone());
        };
        let actual = match algorithm {
            "sha256" => encode_digest(algorithm, &Sha256::digest(data)),
            "sha384" => encode_digest(algorithm, &Sha384::digest(data)),
            "sha512" => encode_digest(algorithm, &Sha512::digest(data)),
            other => return DigestCheck::UnsupportedAlgorithm(other.to_string()),
        };
        if &actual == hash {
            DigestCheck::Match
        } else {
            DigestCheck::HashMismatch {
                expected: hash.clone(),
                actual,
            }
        }
    }
}

/// Outcome of re-hashing a member against its manifest row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestCheck {
    Match,
    Unhashed,
    SizeMismatch { expected: u64, actual: u64 },
    HashMismatch { expected: String, actual: String },
    UnsupportedAlgorithm(String),
}

/// Parsed manifest, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    lines: Vec<RecordLine>,
    crlf: bool,
}

impl Record {
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let lines = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(RecordLine::parse)
            .collect();
        Self {
            lines,
            crlf: contents.contains("\r\n"),
        }
    }

    #[must_use]
    pub fn lines(&self) -> &[RecordLine] {
        &self.lines
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&RecordLine> {
        self.lines.iter().find(|line| line.path == path)
    }

    /// Drops every row for `path` and returns how many were removed.
    pub fn remove(&mut self, path: &str) -> usize {
        let before = self.lines.len();
        self.lines.retain(|line| line.path != path);
        before - self.lines.len()
    }

    /// Inserts `line` before the first row for `anchor`, or appends it.
    pub fn insert_before(&mut self, anchor: &str, line: RecordLine) {
        match self.lines.iter().position(|existing| existing.path == anchor) {
            Some(index) => self.lines.insert(index, line),
            None => self.lines.push(line),
        }
    }

    /// Appends an unhashed row for `path` unless one exists already.
    pub fn ensure_listed(&mut self, path: &str) {
        if self.get(path).is_none() {
            self.lines.push(RecordLine::unhashed(path));
        }
    }

    /// Serializes the manifest, keeping the source's line ending style.
    #[must_use]
    pub fn render(&self) -> String {
        let ending = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line.as_str());
            out.push_str(ending);
        }
        out
    }
}

/// `sha256=<urlsafe-b64-nopad>` digest as written in `RECORD`.
#[must_use]
pub fn record_digest(data: &[u8]) -> String {
    encode_digest("sha256", &Sha256::digest(data))
}

fn encode_digest(algorithm: &str, digest: &[u8]) -> String {
    format!("{algorithm}={}", URL_SAFE_NO_PAD.encode(digest))
}

/// Splits one row into path, hash and size.
///
/// Extra unquoted commas are taken to belong to the path, so only the last two
/// fields are hash and size.
fn split_fields(line: &str) -> (String, Option<String>, Option<String>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut row = csv::StringRecord::new();
    match reader.read_record(&mut row) {
        Ok(true) if row.len() >= 3 => {
            let fields: Vec<&str> = row.iter().collect();
            let (path, tail) = fields.split_at(fields.len() - 2);
            (
                path.join(","),
                Some(tail[0].to_string()),
                Some(tail[1].to_string()),
            )
        }
        Ok(true) => {
            let mut fields = row.iter().map(ToString::to_string);
            let path = fields.next().unwrap_or_default();
            (path, fields.next(), fields.next())
        }
        _ => (line.to_string(), None, None),
    }
}

/// Writes one row, quoting only fields that need it. No line ending.
fn render_row(fields: [&str; 3]) -> String {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::<u8>::new());
    if writer.write_record(fields).is_err() {
        return fields.join(",");
    }
    match writer.into_inner().map(String::from_utf8) {
        Ok(Ok(mut row)) => {
            if row.ends_with('\n') {
                row.pop();
            }
            row
        }
        _ => fields.join(","),
    }
}
