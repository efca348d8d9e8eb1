use std::io::{self, Read, Seek, Write};
use std::path::Path;

use tracing::debug;
use wmi_domain::{Record, RecordLine};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use super::locator::WheelLayout;
use crate::core::errors::InjectError;

const INJECTED_MODE: u32 = 0o644;

/// What the rewrite changed, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewriteStats {
    pub copied: usize,
    pub replaced_metadata: bool,
}

/// Copies a wheel into `sink`, swapping in a new `WHEEL.metadata` and a
/// patched `RECORD`.
///
/// Every other member is copied raw, so its compressed bytes, compression
/// method, timestamps and CRC are unchanged. The patched RECORD keeps the
/// existing rows verbatim and lists the metadata file without a hash.
pub struct ArchiveRewriter<'a> {
    layout: &'a WheelLayout,
    metadata: &'a [u8],
}

impl<'a> ArchiveRewriter<'a> {
    #[must_use]
    pub fn new(layout: &'a WheelLayout, metadata: &'a [u8]) -> Self {
        Self { layout, metadata }
    }

    /// Streams `archive` into `sink`; `dest` only labels write errors.
    pub fn write_to<R, W>(
        &self,
        archive: &mut ZipArchive<R>,
        sink: W,
        dest: &Path,
    ) -> Result<(W, RewriteStats), InjectError>
    where
        R: Read + Seek,
        W: Write + Seek,
    {
        let source = self.layout.path.as_path();
        let (record, stamp) = self.patched_record(archive)?;

        let mut writer = ZipWriter::new(sink);
        let mut stats = RewriteStats {
            copied: 0,
            replaced_metadata: false,
        };
        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index).map_err(|err| {
                InjectError::invalid(source, format!("unreadable entry #{index} ({err})"))
            })?;
            let name = entry.name().to_string();
            if name == self.layout.metadata_path {
                debug!(entry = %name, "dropping previous metadata");
                stats.replaced_metadata = true;
                continue;
            }
            if name == self.layout.record_path {
                continue;
            }
            writer
                .raw_copy_file(entry)
                .map_err(|err| copy_error(source, dest, &name, err))?;
            stats.copied += 1;
        }

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(INJECTED_MODE)
            .last_modified_time(stamp);
        writer
            .start_file(self.layout.metadata_path.as_str(), options)
            .map_err(|err| InjectError::write_zip(dest, err))?;
        writer
            .write_all(self.metadata)
            .map_err(|err| InjectError::write(dest, err))?;
        writer
            .start_file(self.layout.record_path.as_str(), options)
            .map_err(|err| InjectError::write_zip(dest, err))?;
        writer
            .write_all(record.render().as_bytes())
            .map_err(|err| InjectError::write(dest, err))?;

        let sink = writer
            .finish()
            .map_err(|err| InjectError::write_zip(dest, err))?;
        debug!(
            copied = stats.copied,
            replaced = stats.replaced_metadata,
            "archive rewritten"
        );
        Ok((sink, stats))
    }

    /// Reads the source RECORD, swaps the metadata row for an unhashed one,
    /// and returns it with the RECORD's timestamp.
    fn patched_record<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(Record, DateTime), InjectError> {
        let source = self.layout.path.as_path();
        let record_path = self.layout.record_path.as_str();
        let mut entry = archive
            .by_name(record_path)
            .map_err(|err| InjectError::invalid(source, format!("{record_path}: {err}")))?;
        let stamp = entry.last_modified();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).map_err(|err| {
            InjectError::invalid(source, format!("{record_path} is not readable text ({err})"))
        })?;

        let mut record = Record::parse(&contents);
        let pruned = record.remove(&self.layout.metadata_path);
        if pruned > 0 {
            debug!(rows = pruned, "pruned previous metadata rows from RECORD");
        }
        record.insert_before(
            record_path,
            RecordLine::unhashed(&self.layout.metadata_path),
        );
        record.ensure_listed(record_path);
        Ok((record, stamp))
    }
}

/// Maps a failed raw copy to the side that most likely caused it.
///
/// The zip crate reports reads from the source and writes to the sink through
/// the same `Io` variant. A short read means the source member is truncated;
/// any other I/O error is charged to the destination.
fn copy_error(source: &Path, dest: &Path, name: &str, err: ZipError) -> InjectError {
    match err {
        ZipError::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
            InjectError::invalid(source, format!("{name} is truncated ({err})"))
        }
        ZipError::Io(err) => InjectError::write(dest, err),
        other => InjectError::invalid(source, format!("{name}: {other}")),
    }
}
