//! Run-table download through an external metadata tool

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::{PipelineError, Result};

/// Executable used when none is configured
pub const DEFAULT_DOWNLOADER: &str = "pysradb";

/// Default run-table location for a project: `<PROJECT_ID>/SraRunTable.csv`
pub fn default_metadata_path(project_id: &str) -> PathBuf {
    Path::new(project_id).join("SraRunTable.csv")
}

/// Arguments passed to the downloader
pub fn downloader_args(project_id: &str, output: &Path) -> Vec<String> {
    vec![
        "metadata".to_string(),
        project_id.to_string(),
        "--desc".to_string(),
        "--expand".to_string(),
        "-o".to_string(),
        output.display().to_string(),
    ]
}

fn run_downloader(executable: &str, args: &[String]) -> Result<Output> {
    Command::new(executable).args(args).output().map_err(|e| {
        let reason = if e.kind() == ErrorKind::NotFound {
            "executable not found on PATH".to_string()
        } else {
            format!("failed to launch: {}", e)
        };
        PipelineError::ExternalTool {
            tool: executable.to_string(),
            reason,
        }
    })
}

/// Download the run table of `project_id` to `output`
///
/// The parent directory is created first. A tool that cannot be launched or
/// exits unsuccessfully aborts with an [`PipelineError::ExternalTool`] error.
pub fn download_metadata(executable: &str, project_id: &str, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let args = downloader_args(project_id, output);
    log::info!("Downloading run metadata for {} with {}", project_id, executable);
    let output_status = run_downloader(executable, &args)?;

    if !output_status.status.success() {
        let stderr = String::from_utf8_lossy(&output_status.stderr);
        return Err(PipelineError::ExternalTool {
            tool: executable.to_string(),
            reason: format!(
                "exited with status {:?}: {}",
                output_status.status.code(),
                stderr.trim()
            ),
        });
    }

    log::info!("Run metadata saved to {}", output.display());
    Ok(())
}
