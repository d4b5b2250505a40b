//! OS command invocation shared by the speech and print adapters

use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use qcall::DomainError;

/// Run `program` to completion, optionally feeding `input` on stdin.
///
/// The child is killed if the returned future is dropped, so callers bound
/// it with `tokio::time::timeout`.
pub(crate) async fn run(
    program: &str,
    args: &[String],
    input: Option<&str>,
) -> Result<(), DomainError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| DomainError::ExternalService(format!("Failed to spawn {}: {}", program, e)))?;

    if let (Some(text), Some(mut stdin)) = (input, child.stdin.take()) {
        stdin
            .write_all(text.as_bytes())
            .await
            .map_err(|e| DomainError::ExternalService(format!("{} stdin: {}", program, e)))?;
        // closing stdin signals end of input
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| DomainError::ExternalService(format!("{} did not finish: {}", program, e)))?;

    if output.status.success() {
        return Ok(());
    }

    let exit_code = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(DomainError::ExternalService(format!(
        "{} exited with {}: {}",
        program,
        exit_code,
        stderr.trim()
    )))
}

/// Quote a value for a single-quoted PowerShell string
pub(crate) fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
