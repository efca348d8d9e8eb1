use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use wmi_domain::RecordLine;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub(crate) struct WheelSpec {
    pub name: String,
    pub version: String,
    pub files: Vec<(String, Vec<u8>, CompressionMethod)>,
    pub metadata: Option<String>,
    pub dist_info: bool,
    pub record: bool,
}

impl WheelSpec {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            files: vec![
                (
                    format!("{name}/__init__.py"),
                    b"__version__ = \"0\"\n".to_vec(),
                    CompressionMethod::Deflated,
                ),
                (
                    format!("{name}/data.bin"),
                    (0_u8..=255).cycle().take(4096).collect(),
                    CompressionMethod::Stored,
                ),
            ],
            metadata: None,
            dist_info: true,
            record: true,
        }
    }

    pub fn with_metadata(mut self, body: &str) -> Self {
        self.metadata = Some(body.to_string());
        self
    }

    pub fn without_dist_info(mut self) -> Self {
        self.dist_info = false;
        self
    }

    pub fn without_record(mut self) -> Self {
        self.record = false;
        self
    }

    pub fn dist_info_dir(&self) -> String {
        format!("{}-{}.dist-info", self.name, self.version)
    }

    pub fn filename(&self) -> String {
        format!("{}-{}-py3-none-any.whl", self.name, self.version)
    }
}

/// Writes a wheel whose RECORD hashes match its members.
pub(crate) fn write_wheel(dir: &Path, spec: &WheelSpec) -> Result<PathBuf> {
    let path = dir.join(spec.filename());
    let mut zip = ZipWriter::new(File::create(&path)?);
    let mut record = Vec::new();

    for (name, data, method) in &spec.files {
        zip.start_file(name, FileOptions::default().compression_method(*method))?;
        zip.write_all(data)?;
        record.push(RecordLine::hashed(name, data).as_str().to_string());
    }

    if spec.dist_info {
        let dist_info = spec.dist_info_dir();
        let opts = FileOptions::default();
        let metadata = format!(
            "Metadata-Version: 2.1\nName: {}\nVersion: {}\n",
            spec.name, spec.version
        );
        let wheel = "Wheel-Version: 1.0\nGenerator: wmi-test\nRoot-Is-Purelib: true\nTag: py3-none-any\n";
        for (file, body) in [("METADATA", metadata.as_str()), ("WHEEL", wheel)] {
            let member = format!("{dist_info}/{file}");
            zip.start_file(&member, opts)?;
            zip.write_all(body.as_bytes())?;
            record.push(RecordLine::hashed(&member, body.as_bytes()).as_str().to_string());
        }
        if let Some(body) = &spec.metadata {
            let member = format!("{dist_info}/WHEEL.metadata");
            zip.start_file(&member, opts)?;
            zip.write_all(body.as_bytes())?;
            record.push(RecordLine::hashed(&member, body.as_bytes()).as_str().to_string());
        }
        if spec.record {
            let member = format!("{dist_info}/RECORD");
            record.push(format!("{member},,"));
            zip.start_file(&member, opts)?;
            zip.write_all(format!("{}\n", record.join("\n")).as_bytes())?;
        }
    }

    zip.finish()?;
    Ok(path)
}

pub(crate) fn read_member(wheel: &Path, name: &str) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(wheel)?)?;
    let mut entry = archive.by_name(name)?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    Ok(data)
}

pub(crate) fn member_names(wheel: &Path) -> Result<Vec<String>> {
    let mut archive = ZipArchive::new(File::open(wheel)?)?;
    let mut names = Vec::new();
    for index in 0..archive.len() {
        names.push(archive.by_index(index)?.name().to_string());
    }
    Ok(names)
}
