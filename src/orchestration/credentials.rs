//! Resolution of the stdin payload shared by every child of a run.
//!
//! A `csi` value of `@<file>` asks the credential helper that ships next to
//! the `mpx` executable to decrypt `<file>`; the connect string is the line
//! following [`CREDENTIAL_MARKER`] in the helper's output. Any other value is
//! used verbatim, an empty value meaning "no stdin".

use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::constants::{CREDENTIAL_FILE_PREFIX, CREDENTIAL_MARKER};
use crate::error::{MpxError, Result};
use crate::execution::process::exit_code;

/// Resolve the configured `csi` value to the text fed to every child
pub async fn resolve_stdin_payload(csi: &str, helper: &str) -> Result<String> {
    let Some(credential_file) = csi.strip_prefix(CREDENTIAL_FILE_PREFIX) else {
        return Ok(csi.to_string());
    };

    let helper_path = locate_helper(helper)?;
    debug!(helper = %helper_path.display(), "Running credential helper");

    let output = Command::new(&helper_path)
        .arg(credential_file)
        .output()
        .await
        .map_err(|e| MpxError::io(format!("running {}", helper_path.display()), e))?;

    let helper_name = helper_path.display().to_string();
    if !output.status.success() {
        return Err(MpxError::CredentialHelperFailed {
            helper: helper_name,
            code: exit_code(&output.status),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    extract_connect_string(&String::from_utf8_lossy(&output.stdout))
        .ok_or(MpxError::CredentialMarkerMissing {
            helper: helper_name,
        })
}

/// Helper names without a separator are looked up next to the running executable
fn locate_helper(helper: &str) -> Result<PathBuf> {
    let path = if helper.contains('/') {
        PathBuf::from(helper)
    } else {
        let exe = std::env::current_exe().map_err(|e| MpxError::io("locating executable", e))?;
        exe.parent()
            .map(|dir| dir.join(helper))
            .unwrap_or_else(|| PathBuf::from(helper))
    };

    if path.is_file() {
        Ok(path)
    } else {
        Err(MpxError::CredentialHelperNotFound { path })
    }
}

/// The line immediately after the marker line
pub fn extract_connect_string(output: &str) -> Option<String> {
    let mut lines = output.lines();
    lines.find(|line| line.contains(CREDENTIAL_MARKER))?;
    lines.next().map(|line| line.trim().to_string())
}
