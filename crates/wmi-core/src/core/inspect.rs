use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::debug;
use wmi_domain::{decode_metadata, DigestCheck, EnvVarPair, Record};
use zip::ZipArchive;

use crate::core::engine::locator::{entry_names, inspect_archive, open_wheel};
use crate::core::engine::WheelLayout;
use crate::core::errors::InjectError;

/// Injected metadata read back from a wheel.
#[derive(Debug, Clone, Serialize)]
pub struct InjectedMetadata {
    pub layout: WheelLayout,
    /// `None` when the wheel never went through the injector.
    pub variables: Option<Vec<EnvVarPair>>,
}

/// Reads `WHEEL.metadata` from `wheel`, if present.
pub fn read_injected_metadata(wheel: &Path) -> Result<InjectedMetadata, InjectError> {
    let mut archive = open_wheel(wheel)?;
    let layout = inspect_archive(wheel, &mut archive)?;
    let variables = if layout.has_metadata {
        let body = read_text(wheel, &mut archive, &layout.metadata_path)?;
        Some(decode_metadata(&body))
    } else {
        None
    };
    Ok(InjectedMetadata { layout, variables })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariableStatus {
    Match,
    Mismatch { found: String },
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableCheck {
    pub name: String,
    pub expected: String,
    #[serde(flatten)]
    pub status: VariableStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordIssue {
    pub path: String,
    pub problem: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub dist_info_dir: String,
    pub has_metadata: bool,
    pub variables: Vec<VariableCheck>,
    pub record_issues: Vec<RecordIssue>,
}

impl VerifyReport {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.has_metadata
            && self.record_issues.is_empty()
            && self
                .variables
                .iter()
                .all(|check| check.status == VariableStatus::Match)
    }

    #[must_use]
    pub fn failed_variables(&self) -> usize {
        self.variables
            .iter()
            .filter(|check| check.status != VariableStatus::Match)
            .count()
    }
}

/// Checks that `expected` pairs were recorded and that every hashed RECORD
/// row still matches its member.
pub fn verify_wheel(wheel: &Path, expected: &[EnvVarPair]) -> Result<VerifyReport, InjectError> {
    let mut archive = open_wheel(wheel)?;
    let layout = inspect_archive(wheel, &mut archive)?;

    let recorded: HashMap<String, String> = if layout.has_metadata {
        decode_metadata(&read_text(wheel, &mut archive, &layout.metadata_path)?)
            .into_iter()
            .map(|pair| (pair.name, pair.value))
            .collect()
    } else {
        HashMap::new()
    };

    let variables = expected
        .iter()
        .map(|pair| {
            let status = match recorded.get(&pair.name) {
                Some(found) if found == &pair.value => VariableStatus::Match,
                Some(found) => VariableStatus::Mismatch {
                    found: found.clone(),
                },
                None => VariableStatus::Missing,
            };
            VariableCheck {
                name: pair.name.clone(),
                expected: pair.value.clone(),
                status,
            }
        })
        .collect();

    let record_issues = audit_record(wheel, &mut archive, &layout)?;
    Ok(VerifyReport {
        dist_info_dir: layout.dist_info_dir,
        has_metadata: layout.has_metadata,
        variables,
        record_issues,
    })
}

fn audit_record<R: Read + Seek>(
    wheel: &Path,
    archive: &mut ZipArchive<R>,
    layout: &WheelLayout,
) -> Result<Vec<RecordIssue>, InjectError> {
    let record = Record::parse(&read_text(wheel, archive, &layout.record_path)?);
    let members = entry_names(wheel, archive)?;
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for line in record.lines() {
        if !seen.insert(line.path.as_str()) {
            issues.push(RecordIssue {
                path: line.path.clone(),
                problem: "listed more than once".to_string(),
            });
            continue;
        }
        if line.hash.is_none() {
            continue;
        }
        let data = match read_bytes(archive, &line.path) {
            Some(data) => data,
            None => {
                issues.push(RecordIssue {
                    path: line.path.clone(),
                    problem: "listed in RECORD but not in the archive".to_string(),
                });
                continue;
            }
        };
        let problem = match line.check(&data) {
            DigestCheck::Match | DigestCheck::Unhashed => continue,
            DigestCheck::SizeMismatch { expected, actual } => {
                format!("size {actual} does not match recorded {expected}")
            }
            DigestCheck::HashMismatch { expected, actual } => {
                format!("hash {actual} does not match recorded {expected}")
            }
            DigestCheck::UnsupportedAlgorithm(algorithm) => {
                format!("unsupported hash algorithm {algorithm}")
            }
        };
        issues.push(RecordIssue {
            path: line.path.clone(),
            problem,
        });
    }

    for member in members {
        if member.ends_with('/') || seen.contains(member.as_str()) {
            continue;
        }
        issues.push(RecordIssue {
            path: member,
            problem: "not listed in RECORD".to_string(),
        });
    }

    debug!(issues = issues.len(), "audited RECORD");
    Ok(issues)
}

fn read_text<R: Read + Seek>(
    wheel: &Path,
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<String, InjectError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| InjectError::invalid(wheel, format!("{name}: {err}")))?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|err| InjectError::invalid(wheel, format!("{name} is not readable text ({err})")))?;
    Ok(text)
}

fn read_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut entry = archive.by_name(name).ok()?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data).ok()?;
    Some(data)
}
