//! Headless LibreOffice (`soffice`) invocation.
//!
//! # System Requirement
//!
//! LibreOffice must be installed:
//! - **macOS**: `brew install --cask libreoffice`
//! - **Linux**: `apt install libreoffice` or `dnf install libreoffice`
//! - **Windows**: `winget install LibreOffice.LibreOffice`
//!
//! A custom location can be configured through `[office] binary` or `DOCSHIFT_SOFFICE_PATH`.

use std::collections::HashSet;
use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::config::OfficeConfig;
use crate::core::process::{CapturedOutput, ProcessError, run_captured};
use crate::{DocshiftError, Result};

use super::run::ConversionRun;

/// Flags that keep soffice from touching UI state, restoring sessions or waiting on locks.
const HEADLESS_FLAGS: [&str; 5] = [
    "--headless",
    "--norestore",
    "--nolockcheck",
    "--nodefault",
    "--nofirststartwizard",
];

fn libreoffice_install_message() -> String {
    "LibreOffice (soffice) is required for PDF/DOCX conversion. \
Install: macOS: 'brew install --cask libreoffice', \
Linux: 'apt install libreoffice', \
Windows: 'winget install LibreOffice.LibreOffice'. \
If LibreOffice is installed in a custom location, set DOCSHIFT_SOFFICE_PATH to the soffice executable."
        .to_string()
}

/// Executable name used when nothing better is found.
pub fn default_binary_name() -> &'static str {
    // soffice.com stays attached to the console, which is what headless runs want on Windows
    if cfg!(windows) { "soffice.com" } else { "soffice" }
}

/// Well-known install locations followed by every `PATH` entry, without duplicates.
pub fn soffice_candidates() -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let mut push_candidate = |path: PathBuf| {
        if seen.insert(path.clone()) {
            candidates.push(path);
        }
    };

    if cfg!(target_os = "macos") {
        push_candidate(PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"));
    }

    if cfg!(target_os = "windows") {
        push_candidate(PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.com"));
        push_candidate(PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.exe"));
        push_candidate(PathBuf::from(
            "C:\\Program Files (x86)\\LibreOffice\\program\\soffice.exe",
        ));
    }

    if let Some(path_env) = env::var_os("PATH") {
        for dir in env::split_paths(&path_env) {
            push_candidate(dir.join("soffice"));
            push_candidate(dir.join("libreoffice"));
            push_candidate(dir.join("soffice.com"));
            push_candidate(dir.join("soffice.exe"));
        }
    }

    candidates
}

/// First existing candidate, or `None`.
pub fn locate_soffice_binary() -> Option<PathBuf> {
    soffice_candidates()
        .into_iter()
        .find(|candidate| std::fs::metadata(candidate).is_ok_and(|m| m.is_file()))
}

/// Runs soffice with a fixed binary and timeouts.
#[derive(Debug, Clone)]
pub struct SofficeRunner {
    binary: PathBuf,
    timeout: Duration,
    probe_timeout: Duration,
}

impl SofficeRunner {
    /// Build from configuration; without an explicit binary, discovery is attempted once here.
    pub fn new(config: &OfficeConfig) -> Self {
        let binary = config
            .binary
            .clone()
            .or_else(locate_soffice_binary)
            .unwrap_or_else(|| PathBuf::from(default_binary_name()));

        Self {
            binary,
            timeout: Duration::from_secs(config.timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check that the binary runs, returning the first line of `soffice --version`.
    ///
    /// # Errors
    ///
    /// `DocshiftError::MissingDependency` when the binary is missing, fails, or hangs.
    pub async fn probe(&self) -> Result<String> {
        let output = run_captured(&self.binary, ["--version"], self.probe_timeout)
            .await
            .map_err(|e| {
                DocshiftError::MissingDependency(format!(
                    "LibreOffice not found or not executable at '{}': {}. {}",
                    self.binary.display(),
                    e,
                    libreoffice_install_message()
                ))
            })?;

        if !output.success {
            return Err(DocshiftError::MissingDependency(format!(
                "LibreOffice executable '{}' responded with a failure when checking '--version': {}",
                self.binary.display(),
                output.diagnostics().trim()
            )));
        }

        Ok(output.stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// Arguments for one `--convert-to` invocation writing into the run's work directory.
    pub fn conversion_args(
        &self,
        run: &ConversionRun,
        input: &Path,
        convert_to: &str,
        infilter: Option<&str>,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::with_capacity(HEADLESS_FLAGS.len() + 7);
        args.push(format!("-env:UserInstallation={}", run.profile_url()).into());
        args.extend(HEADLESS_FLAGS.iter().map(OsString::from));
        if let Some(filter) = infilter {
            args.push(format!("--infilter={}", filter).into());
        }
        args.push("--convert-to".into());
        args.push(convert_to.into());
        args.push("--outdir".into());
        args.push(run.work_dir().as_os_str().to_owned());
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Run one conversion. A non-zero exit status is returned as output, not as an error.
    pub async fn convert(
        &self,
        run: &ConversionRun,
        input: &Path,
        convert_to: &str,
        infilter: Option<&str>,
    ) -> std::result::Result<CapturedOutput, ProcessError> {
        let args = self.conversion_args(run, input, convert_to, infilter);
        tracing::debug!(
            run = %run.id(),
            binary = %self.binary.display(),
            args = ?args,
            "Invoking soffice"
        );
        run_captured(&self.binary, &args, self.timeout).await
    }
}
