use anyhow::Context;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::backend::FormatSelector;
use crate::gateway::MediaKind;
use crate::Result;

const WORKSPACE_PREFIX: &str = "naqra-job-";

/// Private directory for one pipeline run.
///
/// Everything the backend writes lands here and is removed when the
/// workspace is released or dropped, whichever comes first.
pub struct JobWorkspace {
    dir: TempDir,
}

/// A downloaded file ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFile {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl JobWorkspace {
    pub fn create(root: &Path) -> Result<Self> {
        fs_err::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .with_context(|| format!("Failed to create job directory in {}", root.display()))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete the directory and everything in it
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => tracing::debug!("Released job directory {}", path.display()),
            Err(e) => tracing::warn!("Failed to remove job directory {}: {}", path.display(), e),
        }
    }

    /// Remove job directories left behind by a previous process
    pub fn purge_stale(root: &Path) -> usize {
        let Ok(entries) = fs_err::read_dir(root) else {
            return 0;
        };

        let mut purged = 0;
        for entry in entries.flatten() {
            let is_job_dir = entry.file_name().to_string_lossy().starts_with(WORKSPACE_PREFIX)
                && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_job_dir && fs_err::remove_dir_all(entry.path()).is_ok() {
                purged += 1;
            }
        }
        purged
    }
}

/// Find the file the backend actually produced for `reported`.
///
/// Audio extraction swaps the extension after download and merges may change
/// the container, so the reported name is only a starting point.
pub fn locate_artifact(
    reported: &Path,
    selector: &FormatSelector,
    workspace: &Path,
) -> Option<ArtifactFile> {
    let (kind, expected_ext) = match selector {
        FormatSelector::AudioOnly { codec } => (MediaKind::Audio, codec.as_str()),
        FormatSelector::VideoUpTo { container, .. } | FormatSelector::BestVideo { container } => {
            (MediaKind::Video, container.as_str())
        }
    };

    let derived = reported.with_extension(expected_ext);
    let candidates = match kind {
        MediaKind::Audio => [derived, reported.to_path_buf()],
        MediaKind::Video => [reported.to_path_buf(), derived],
    };

    let path = candidates
        .into_iter()
        .find(|p| p.is_file())
        .or_else(|| find_by_stem(reported, workspace))?;

    Some(ArtifactFile { path, kind })
}

fn find_by_stem(reported: &Path, workspace: &Path) -> Option<PathBuf> {
    let stem = reported.file_stem()?.to_os_string();
    fs_err::read_dir(workspace)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.file_stem() == Some(stem.as_os_str()))
        // partial downloads are not deliverable
        .find(|p| !matches!(p.extension().and_then(|e| e.to_str()), Some("part" | "ytdl" | "temp")))
}
