//! Recalculation through a headless LibreOffice conversion.
//!
//! The workbook is written to a scratch directory, converted xlsx -> xlsx by
//! `soffice --convert-to`, and read back. LibreOffice recomputes formulas while
//! loading because the throwaway user profile forces "always recalculate" for
//! OOXML files.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use umya_spreadsheet::{reader, writer, Spreadsheet};
use url::Url;

use super::error::RecalcError;
use super::Recalculator;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const STAGED_NAME: &str = "workbook.xlsx";

/// Profile settings: OOXMLRecalcMode 0 = always recalculate on load
const REGISTRY_MODIFICATIONS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<oor:items xmlns:oor="http://openoffice.org/2001/registry" xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<item oor:path="/org.openoffice.Office.Calc/Formula/Load"><prop oor:name="OOXMLRecalcMode" oor:op="fuse"><value>0</value></prop></item>
<item oor:path="/org.openoffice.Office.Calc/Formula/Load"><prop oor:name="ODFRecalcMode" oor:op="fuse"><value>0</value></prop></item>
</oor:items>
"#;

pub struct LibreOfficeRecalculator {
    program: PathBuf,
    timeout: Duration,
}

impl LibreOfficeRecalculator {
    pub fn new(program: PathBuf, timeout: Duration) -> Self {
        Self { program, timeout }
    }

    fn command(&self, profile: &Path, out_dir: &Path, input: &Path) -> Result<Command, RecalcError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless")
            .arg("--invisible")
            .arg("--nocrashreport")
            .arg("--nodefault")
            .arg("--nologo")
            .arg("--nofirststartwizard")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation={}", file_url(profile)?))
            .arg("--convert-to")
            .arg("xlsx:Calc MS Excel 2007 XML")
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);
        Ok(cmd)
    }
}

impl Recalculator for LibreOfficeRecalculator {
    fn name(&self) -> &str {
        "libreoffice"
    }

    fn recalculate(&self, book: &mut Spreadsheet) -> Result<(), RecalcError> {
        let scratch = tempfile::tempdir().map_err(|e| RecalcError::Stage(e.to_string()))?;
        let in_dir = scratch.path().join("in");
        let out_dir = scratch.path().join("out");
        let profile = scratch.path().join("profile");
        for dir in [&in_dir, &out_dir, &profile.join("user")] {
            fs::create_dir_all(dir).map_err(|e| RecalcError::Stage(e.to_string()))?;
        }
        fs::write(
            profile.join("user").join("registrymodifications.xcu"),
            REGISTRY_MODIFICATIONS,
        )
        .map_err(|e| RecalcError::Stage(e.to_string()))?;

        let input = in_dir.join(STAGED_NAME);
        writer::xlsx::write(book, &input).map_err(|e| RecalcError::Stage(e.to_string()))?;

        let stdout_path = scratch.path().join("stdout.log");
        let stderr_path = scratch.path().join("stderr.log");
        let stdout = File::create(&stdout_path).map_err(|e| RecalcError::Stage(e.to_string()))?;
        let stderr = File::create(&stderr_path).map_err(|e| RecalcError::Stage(e.to_string()))?;

        let mut cmd = self.command(&profile, &out_dir, &input)?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));

        tracing::debug!("Starting recalculation: {:?}", cmd);
        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| RecalcError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let status = wait_with_deadline(&mut child, self.timeout)?;
        let output = read_output(&stderr_path, &stdout_path);
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, %status, "engine finished");

        if !status.success() {
            return Err(RecalcError::Failed {
                program: self.program.display().to_string(),
                status: status.to_string(),
                output,
            });
        }

        let converted = out_dir.join(STAGED_NAME);
        if !converted.exists() {
            return Err(RecalcError::MissingOutput {
                path: converted.display().to_string(),
                output,
            });
        }

        *book = reader::xlsx::read(&converted).map_err(|e| RecalcError::Reload(e.to_string()))?;
        Ok(())
    }
}

fn wait_with_deadline(child: &mut Child, timeout: Duration) -> Result<ExitStatus, RecalcError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => return Err(RecalcError::Stage(format!("Failed to wait for engine: {}", e))),
        }

        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RecalcError::Timeout(timeout.as_secs()));
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

/// stderr first, then stdout; whichever is empty is left out
fn read_output(stderr_path: &Path, stdout_path: &Path) -> String {
    let stderr = fs::read_to_string(stderr_path).unwrap_or_default();
    let stdout = fs::read_to_string(stdout_path).unwrap_or_default();
    [stderr.trim(), stdout.trim()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `file://` URL for a local directory, percent-encoded so LibreOffice accepts it
fn file_url(path: &Path) -> Result<String, RecalcError> {
    Url::from_file_path(path)
        .map(String::from)
        .map_err(|_| RecalcError::Stage(format!("Not an absolute path: {}", path.display())))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use umya_spreadsheet::new_file;

    fn fake_engine(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("soffice");
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_profile_url_is_percent_encoded() {
        let url = file_url(Path::new("/tmp/lo profile#1/profile")).unwrap();
        assert_eq!(url, "file:///tmp/lo%20profile%231/profile");
        assert!(file_url(Path::new("relative/profile")).is_err());
    }

    #[test]
    fn test_failure_carries_engine_output() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_engine(
            dir.path(),
            "#!/bin/sh\necho 'Err:502 in cliente.W57' >&2\nexit 3\n",
        );
        let engine = LibreOfficeRecalculator::new(program, Duration::from_secs(10));

        let mut book = new_file();
        let err = engine.recalculate(&mut book).unwrap_err();
        match &err {
            RecalcError::Failed { output, .. } => assert!(output.contains("W57")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("W57"));
    }

    #[test]
    fn test_missing_output_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_engine(dir.path(), "#!/bin/sh\nexit 0\n");
        let engine = LibreOfficeRecalculator::new(program, Duration::from_secs(10));

        let mut book = new_file();
        let err = engine.recalculate(&mut book).unwrap_err();
        assert!(matches!(err, RecalcError::MissingOutput { .. }));
    }

    #[test]
    fn test_converted_workbook_replaces_in_memory_copy() {
        let dir = tempfile::tempdir().unwrap();
        // Copies the staged input to --outdir, standing in for the conversion.
        let program = fake_engine(
            dir.path(),
            "#!/bin/sh\nout=''\nprev=''\nfor a in \"$@\"; do\n  if [ \"$prev\" = '--outdir' ]; then out=\"$a\"; fi\n  prev=\"$a\"\n  last=\"$a\"\ndone\ncp \"$last\" \"$out/\"\n",
        );
        let engine = LibreOfficeRecalculator::new(program, Duration::from_secs(10));

        let mut book = new_file();
        book.get_sheet_mut(&0)
            .unwrap()
            .get_cell_mut("B2")
            .set_value_number(12);
        engine.recalculate(&mut book).unwrap();

        let value = book.get_sheet(&0).unwrap().get_cell("B2").unwrap().get_value_number();
        assert_eq!(value, Some(12.0));
    }

    #[test]
    fn test_hung_engine_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_engine(dir.path(), "#!/bin/sh\nexec sleep 30\n");
        let engine = LibreOfficeRecalculator::new(program, Duration::from_secs(1));

        let mut book = new_file();
        let err = engine.recalculate(&mut book).unwrap_err();
        assert!(matches!(err, RecalcError::Timeout(1)));
    }
}
