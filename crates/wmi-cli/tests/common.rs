#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use wmi_domain::RecordLine;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// The binary with config variables cleared so the caller's shell can't leak in.
pub fn wmi() -> Command {
    let mut cmd = cargo_bin_cmd!("wheel-metadata-injector");
    cmd.env_remove("WHEEL_METADATA_INJECTOR_SKIP")
        .env_remove("WHEEL_METADATA_INJECTOR_ENV_FILE")
        .env("NO_COLOR", "1");
    cmd
}

/// Writes `<name>-<version>-py3-none-any.whl` with a consistent RECORD.
pub fn build_wheel(dir: &Path, name: &str, version: &str) -> PathBuf {
    let path = dir.join(format!("{name}-{version}-py3-none-any.whl"));
    let mut zip = ZipWriter::new(File::create(&path).expect("create wheel"));
    let opts = FileOptions::default();
    let dist_info = format!("{name}-{version}.dist-info");
    let members = [
        (format!("{name}/__init__.py"), b"print('hi')\n".to_vec()),
        (
            format!("{dist_info}/METADATA"),
            format!("Metadata-Version: 2.1\nName: {name}\nVersion: {version}\n").into_bytes(),
        ),
        (
            format!("{dist_info}/WHEEL"),
            b"Wheel-Version: 1.0\nRoot-Is-Purelib: true\nTag: py3-none-any\n".to_vec(),
        ),
    ];
    let mut record = String::new();
    for (member, data) in &members {
        zip.start_file(member, opts).expect("start member");
        zip.write_all(data).expect("write member");
        record.push_str(RecordLine::hashed(member, data).as_str());
        record.push('\n');
    }
    record.push_str(&format!("{dist_info}/RECORD,,\n"));
    zip.start_file(format!("{dist_info}/RECORD"), opts)
        .expect("start RECORD");
    zip.write_all(record.as_bytes()).expect("write RECORD");
    zip.finish().expect("finish wheel");
    path
}

pub fn read_member(wheel: &Path, member: &str) -> Option<String> {
    let mut archive = ZipArchive::new(File::open(wheel).expect("open wheel")).expect("zip");
    let mut entry = archive.by_name(member).ok()?;
    let mut text = String::new();
    entry.read_to_string(&mut text).expect("read member");
    Some(text)
}

pub fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf8 stdout")
}

pub fn json_of(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json stdout")
}
