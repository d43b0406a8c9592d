//! Per-conversion workspace.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::Result;
use crate::core::naming::new_run_id;

/// Name of the sanitised input copy inside `work/`, without extension.
const INPUT_STEM: &str = "input";

/// Directory tree owned by one conversion:
///
/// ```text
/// <out_root>/run-<id>/
///     lo-profile/     isolated office-suite user profile
///     work/           input copy and intermediate documents
/// ```
///
/// A run is never reused; the whole tree is removed when the value is dropped.
#[derive(Debug)]
pub struct ConversionRun {
    id: String,
    root: PathBuf,
    profile_dir: PathBuf,
    work_dir: PathBuf,
    input: PathBuf,
}

impl ConversionRun {
    /// Create a fresh run under `out_root` and copy `source` into it as `work/input.<input_ext>`.
    pub async fn create(out_root: &Path, source: &Path, input_ext: &str) -> Result<Self> {
        let id = new_run_id();
        let root = out_root.join(format!("run-{}", id));
        let profile_dir = root.join("lo-profile");
        let work_dir = root.join("work");
        let input = work_dir.join(format!("{}.{}", INPUT_STEM, input_ext));

        fs::create_dir_all(&root).await?;
        let run = Self {
            id,
            root,
            profile_dir,
            work_dir,
            input,
        };

        fs::create_dir_all(&run.profile_dir).await?;
        fs::create_dir_all(&run.work_dir).await?;
        fs::copy(source, &run.input).await?;

        tracing::debug!(run = %run.id, root = %run.root.display(), "Created conversion run");
        Ok(run)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The sanitised input copy.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// `file://` URL of the profile directory, as expected by `-env:UserInstallation`.
    pub fn profile_url(&self) -> String {
        file_url(&self.profile_dir)
    }

    /// First file in `work/` with extension `ext` (case-insensitive), ignoring the input copy.
    pub async fn find_output(&self, ext: &str) -> Result<Option<PathBuf>> {
        Ok(self.outputs_with_ext(ext).await?.into_iter().next())
    }

    /// Every file in `work/` with extension `ext` except the input copy, sorted by path.
    async fn outputs_with_ext(&self, ext: &str) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(&self.work_dir).await?;
        let mut found = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path == self.input || !entry.file_type().await?.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ext));
            if matches {
                found.push(path);
            }
        }

        // read_dir order is unspecified
        found.sort();
        Ok(found)
    }

    /// Delete every `ext` file in `work/` except the input copy and `keep`.
    ///
    /// Run before each soffice step: a step may only claim a file it wrote itself.
    pub async fn discard_outputs(&self, ext: &str, keep: &Path) -> Result<()> {
        for stale in self.outputs_with_ext(ext).await? {
            if stale == keep {
                continue;
            }
            tracing::debug!(run = %self.id, path = %stale.display(), "Discarding stale output");
            fs::remove_file(&stale).await?;
        }
        Ok(())
    }

    /// Find the produced `ext` file and move it to `work/<name>`.
    pub async fn claim_output(&self, ext: &str, name: &str) -> Result<Option<PathBuf>> {
        let Some(produced) = self.find_output(ext).await? else {
            return Ok(None);
        };

        let target = self.work_dir.join(name);
        if produced != target {
            fs::rename(&produced, &target).await?;
        }
        Ok(Some(target))
    }
}

impl Drop for ConversionRun {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.root) {
            Ok(()) => tracing::debug!(run = %self.id, "Removed conversion run directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                run = %self.id,
                path = %self.root.display(),
                "Failed to remove conversion run directory: {}",
                e
            ),
        }
    }
}

/// Absolute `file://` URL for `path`, with forward slashes and each segment percent-encoded.
pub fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let full = absolute.to_string_lossy().replace('\\', "/");

    let segments: Vec<String> = full
        .trim_start_matches('/')
        .split('/')
        .map(|segment| {
            if is_drive_letter(segment) {
                segment.to_string()
            } else {
                urlencoding::encode(segment).into_owned()
            }
        })
        .collect();

    format!("file:///{}", segments.join("/"))
}

/// `C:` style Windows drive prefix, kept verbatim in file URLs.
fn is_drive_letter(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
