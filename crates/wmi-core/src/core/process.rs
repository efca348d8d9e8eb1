use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};
use wmi_domain::{encode_metadata, EnvVarPair, Selection};

use crate::core::config::{EnvLookup, ProcessEnv};
use crate::core::engine::locator::{inspect_archive, open_wheel};
use crate::core::engine::{select, ArchiveRewriter, OutputPolicy, StagedOutput};
use crate::core::errors::InjectError;

/// One injection: which wheel, where the result goes, which variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectRequest {
    pub wheel: PathBuf,
    /// `None` (or the wheel's own path) rewrites the wheel in place.
    pub output: Option<PathBuf>,
    pub selection: Selection,
}

impl InjectRequest {
    pub fn new(wheel: impl Into<PathBuf>, selection: Selection) -> Self {
        Self {
            wheel: wheel.into(),
            output: None,
            selection,
        }
    }

    #[must_use]
    pub fn with_output(mut self, output: Option<PathBuf>) -> Self {
        self.output = output;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InjectReport {
    pub path: PathBuf,
    pub in_place: bool,
    pub dist_info_dir: String,
    pub metadata_path: String,
    pub variables: Vec<EnvVarPair>,
    /// The source already carried a metadata file, which was replaced.
    pub replaced_existing: bool,
    pub sha256: String,
    pub size: u64,
}

/// Selects variables with `lookup` and writes them into the requested wheel.
#[instrument(skip_all, fields(wheel = %request.wheel.display()))]
pub fn process_wheel_with(
    request: &InjectRequest,
    lookup: &dyn EnvLookup,
) -> Result<InjectReport, InjectError> {
    let variables = select(&request.selection, lookup)?;
    debug!(
        selection = %request.selection.describe(),
        count = variables.len(),
        "selected variables"
    );
    inject_variables(&request.wheel, request.output.as_deref(), variables)
}

/// Writes already-selected `variables` into `wheel`.
///
/// The result is staged next to its destination and renamed into place only
/// after the archive is complete, so a failure leaves the destination as it was.
pub fn inject_variables(
    wheel: &Path,
    output: Option<&Path>,
    variables: Vec<EnvVarPair>,
) -> Result<InjectReport, InjectError> {
    let body = encode_metadata(&variables);
    let mut archive = open_wheel(wheel)?;
    let layout = inspect_archive(wheel, &mut archive)?;
    if variables.is_empty() {
        debug!("no environment variables found to inject; writing an empty metadata file");
    }
    let permissions = fs::metadata(wheel).map(|meta| meta.permissions()).ok();

    let policy = OutputPolicy::resolve(wheel, output);
    let destination = policy.destination(wheel);
    let mut staged = StagedOutput::create(&destination)?;
    let (sink, stats) = ArchiveRewriter::new(&layout, &body).write_to(
        &mut archive,
        staged.writer(),
        &destination,
    )?;
    sink.into_inner()
        .map_err(|err| InjectError::write(&destination, err.into_error()))?;
    drop(archive);

    let (sha256, size) = staged.digest()?;
    let path = staged.commit(permissions)?;
    info!(
        path = %path.display(),
        variables = variables.len(),
        replaced = stats.replaced_metadata,
        "wrote build environment metadata"
    );
    Ok(InjectReport {
        path,
        in_place: policy.is_in_place(),
        dist_info_dir: layout.dist_info_dir,
        metadata_path: layout.metadata_path,
        variables,
        replaced_existing: stats.replaced_metadata,
        sha256,
        size,
    })
}

/// Injects the whitelisted variables from the process environment.
pub fn process_wheel(wheel: &Path, output: Option<&Path>) -> Result<PathBuf, InjectError> {
    run_with_process_env(wheel, output, Selection::Whitelist)
}

/// Injects the variables named in a comma-separated list.
pub fn process_wheel_with_env_vars(
    wheel: &Path,
    env_vars: &str,
    output: Option<&Path>,
) -> Result<PathBuf, InjectError> {
    run_with_process_env(wheel, output, Selection::Explicit(env_vars.to_string()))
}

/// Injects the variables named in `env_file`, one per line.
pub fn process_wheel_with_env_file(
    wheel: &Path,
    env_file: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, InjectError> {
    run_with_process_env(wheel, output, Selection::File(env_file.to_path_buf()))
}

fn run_with_process_env(
    wheel: &Path,
    output: Option<&Path>,
    selection: Selection,
) -> Result<PathBuf, InjectError> {
    let request = InjectRequest::new(wheel, selection).with_output(output.map(Path::to_path_buf));
    process_wheel_with(&request, &ProcessEnv).map(|report| report.path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::EnvSnapshot;
    use crate::core::test_support::{member_names, read_member, write_wheel, WheelSpec};
    use anyhow::Result;
    use tempfile::tempdir;
    use wmi_domain::{DigestCheck, Record};

    fn tmp_leftovers(dir: &Path) -> Result<usize> {
        let mut count = 0;
        for entry in fs::read_dir(dir)? {
            if entry?.file_name().to_string_lossy().ends_with(".tmp") {
                count += 1;
            }
        }
        Ok(count)
    }

    #[test]
    fn explicit_selection_writes_expected_body() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let output = temp.path().join("out").join("demo-1.0-py3-none-any.whl");
        fs::create_dir_all(output.parent().unwrap())?;
        let source_before = fs::read(&wheel)?;

        let env = EnvSnapshot::testing(&[("TEST_ENV_VAR", "test_value")]);
        let request = InjectRequest::new(&wheel, Selection::Explicit("TEST_ENV_VAR".into()))
            .with_output(Some(output.clone()));
        let report = process_wheel_with(&request, &env)?;

        assert_eq!(report.path, output);
        assert!(!report.in_place);
        assert_eq!(
            read_member(&output, "demo-1.0.dist-info/WHEEL.metadata")?,
            b"TEST_ENV_VAR: test_value\n"
        );
        assert_eq!(fs::read(&wheel)?, source_before, "source must be untouched");
        assert_eq!(report.size, fs::metadata(&output)?.len());
        Ok(())
    }

    #[test]
    fn file_selection_keeps_listed_order() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let names = temp.path().join("vars.txt");
        fs::write(&names, "TEST_ENV_VAR\nANOTHER_TEST_VAR")?;
        let env = EnvSnapshot::testing(&[
            ("ANOTHER_TEST_VAR", "another_value"),
            ("TEST_ENV_VAR", "test_value"),
        ]);

        let request = InjectRequest::new(&wheel, Selection::File(names));
        process_wheel_with(&request, &env)?;
        assert_eq!(
            read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata")?,
            b"TEST_ENV_VAR: test_value\nANOTHER_TEST_VAR: another_value\n"
        );
        Ok(())
    }

    #[test]
    fn in_place_leaves_no_temporary_files() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let env = EnvSnapshot::testing(&[("CC", "gcc")]);
        let request = InjectRequest::new(&wheel, Selection::Whitelist)
            .with_output(Some(wheel.clone()));

        let report = process_wheel_with(&request, &env)?;
        assert!(report.in_place);
        assert_eq!(report.path, wheel);
        assert_eq!(tmp_leftovers(temp.path())?, 0);
        assert_eq!(
            read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata")?,
            b"CC: gcc\n"
        );
        Ok(())
    }

    #[test]
    fn reinjection_is_idempotent() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let env = EnvSnapshot::testing(&[("CUDA_VERSION", "12.4")]);
        let request = InjectRequest::new(&wheel, Selection::Whitelist);

        let first = process_wheel_with(&request, &env)?;
        let first_body = read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata")?;
        let second = process_wheel_with(&request, &env)?;
        let second_body = read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata")?;

        assert!(!first.replaced_existing);
        assert!(second.replaced_existing);
        assert_eq!(first_body, second_body);
        assert_eq!(first.sha256, second.sha256);
        let names = member_names(&wheel)?;
        assert_eq!(
            names
                .iter()
                .filter(|name| name.as_str() == "demo-1.0.dist-info/WHEEL.metadata")
                .count(),
            1
        );
        Ok(())
    }

    #[test]
    fn empty_selection_still_produces_valid_wheel() -> Result<()> {
        let temp = tempdir()?;
        let spec = WheelSpec::new("demo", "1.0");
        let wheel = write_wheel(temp.path(), &spec)?;

        let report =
            process_wheel_with(&InjectRequest::new(&wheel, Selection::Whitelist), &EnvSnapshot::default())?;
        assert!(report.variables.is_empty());
        assert!(read_member(&wheel, "demo-1.0.dist-info/WHEEL.metadata")?.is_empty());

        let record = String::from_utf8(read_member(&wheel, "demo-1.0.dist-info/RECORD")?)?;
        for line in Record::parse(&record).lines() {
            let data = read_member(&wheel, &line.path)?;
            assert!(matches!(
                line.check(&data),
                DigestCheck::Match | DigestCheck::Unhashed
            ));
        }
        for (name, data, _) in &spec.files {
            assert_eq!(&read_member(&wheel, name)?, data);
        }
        Ok(())
    }

    #[test]
    fn failed_run_leaves_source_unchanged() -> Result<()> {
        let temp = tempdir()?;
        let spec = WheelSpec::new("demo", "1.0").without_record();
        let wheel = write_wheel(temp.path(), &spec)?;
        let before = fs::read(&wheel)?;

        let err = process_wheel_with(
            &InjectRequest::new(&wheel, Selection::Whitelist),
            &EnvSnapshot::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InjectError::InvalidWheel { .. }));
        assert_eq!(fs::read(&wheel)?, before);
        assert_eq!(tmp_leftovers(temp.path())?, 0);
        Ok(())
    }

    #[test]
    fn unwritable_destination_is_a_write_error() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let output = temp.path().join("missing-dir").join("out.whl");
        let err = process_wheel_with(
            &InjectRequest::new(&wheel, Selection::Whitelist).with_output(Some(output.clone())),
            &EnvSnapshot::default(),
        )
        .unwrap_err();
        assert!(matches!(err, InjectError::ArchiveWrite { .. }));
        assert!(!output.exists());
        Ok(())
    }

    #[test]
    fn output_onto_existing_directory_is_a_write_error() -> Result<()> {
        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        let before = fs::read(&wheel)?;
        let output = temp.path().join("out");
        fs::create_dir(&output)?;

        let err = process_wheel_with(
            &InjectRequest::new(&wheel, Selection::Whitelist).with_output(Some(output.clone())),
            &EnvSnapshot::default(),
        )
        .unwrap_err();

        assert!(matches!(err, InjectError::ArchiveWrite { ref path, .. } if path == &output));
        assert!(output.is_dir());
        assert_eq!(tmp_leftovers(temp.path())?, 0);
        assert_eq!(fs::read(&wheel)?, before);
        Ok(())
    }

    #[test]
    fn missing_wheel_is_not_found() {
        let err = process_wheel_with(
            &InjectRequest::new("/nonexistent/demo-1.0-py3-none-any.whl", Selection::Whitelist),
            &EnvSnapshot::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "WMI101");
    }

    #[cfg(unix)]
    #[test]
    fn in_place_keeps_file_mode() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempdir()?;
        let wheel = write_wheel(temp.path(), &WheelSpec::new("demo", "1.0"))?;
        fs::set_permissions(&wheel, fs::Permissions::from_mode(0o644))?;
        process_wheel_with(
            &InjectRequest::new(&wheel, Selection::Whitelist),
            &EnvSnapshot::default(),
        )?;
        assert_eq!(fs::metadata(&wheel)?.permissions().mode() & 0o777, 0o644);
        Ok(())
    }
}
