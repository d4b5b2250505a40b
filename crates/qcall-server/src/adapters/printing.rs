//! Print Strategies
//!
//! OS print commands, plus the acknowledgment echo that always succeeds and
//! is wired last so the print queue never stalls.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use qcall::domain::services::ticket_slip;
use qcall::{DomainError, PrintPayload, PrintStrategy};

use super::process::{self, powershell_quote};

/// Which OS print command to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintCommand {
    /// CUPS `lp`, slip on stdin
    Lp,
    /// BSD `lpr`, slip on stdin
    Lpr,
    /// PowerShell `Out-Printer` over a spooled file
    OutPrinter,
}

impl PrintCommand {
    fn name(self) -> &'static str {
        match self {
            PrintCommand::Lp => "lp",
            PrintCommand::Lpr => "lpr",
            PrintCommand::OutPrinter => "out-printer",
        }
    }
}

/// Slip written to disk for a spool-based print command.
///
/// The file is removed on drop, so a print cancelled by a timeout still
/// cleans up after itself.
struct SpoolFile {
    path: PathBuf,
}

impl SpoolFile {
    async fn create(dir: &Path, slip: &str) -> Result<Self, DomainError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| DomainError::ExternalService(format!("Spool dir: {}", e)))?;

        let file = Self {
            path: dir.join(format!("qcall-slip-{}.txt", Uuid::new_v4())),
        };
        tokio::fs::write(&file.path, slip)
            .await
            .map_err(|e| DomainError::ExternalService(format!("Spool write: {}", e)))?;
        Ok(file)
    }
}

impl Drop for SpoolFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(path = %self.path.display(), "Spool file not removed: {}", e);
            }
        }
    }
}

pub struct CommandPrinter {
    command: PrintCommand,
    printer: Option<String>,
    spool_dir: PathBuf,
    timeout: Duration,
}

impl CommandPrinter {
    pub fn new(
        command: PrintCommand,
        printer: Option<String>,
        spool_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            command,
            printer,
            spool_dir,
            timeout,
        }
    }

    /// Print commands available on this platform, in preference order
    pub fn platform_defaults(
        printer: Option<String>,
        spool_dir: PathBuf,
        timeout: Duration,
    ) -> Vec<Self> {
        let commands: &[PrintCommand] = if cfg!(windows) {
            &[PrintCommand::OutPrinter]
        } else {
            &[PrintCommand::Lp, PrintCommand::Lpr]
        };

        commands
            .iter()
            .map(|&command| Self::new(command, printer.clone(), spool_dir.clone(), timeout))
            .collect()
    }

    fn args(&self, spool_file: Option<&str>) -> (&'static str, Vec<String>) {
        match self.command {
            PrintCommand::Lp => {
                let mut args = Vec::new();
                if let Some(printer) = &self.printer {
                    args.push("-d".to_string());
                    args.push(printer.clone());
                }
                ("lp", args)
            }
            PrintCommand::Lpr => {
                let mut args = Vec::new();
                if let Some(printer) = &self.printer {
                    args.push("-P".to_string());
                    args.push(printer.clone());
                }
                ("lpr", args)
            }
            PrintCommand::OutPrinter => {
                let mut script = format!(
                    "Get-Content -Encoding UTF8 -Path {} | Out-Printer",
                    powershell_quote(spool_file.unwrap_or_default())
                );
                if let Some(printer) = &self.printer {
                    script.push_str(&format!(" -Name {}", powershell_quote(printer)));
                }
                (
                    "powershell",
                    vec![
                        "-NoProfile".to_string(),
                        "-NonInteractive".to_string(),
                        "-Command".to_string(),
                        script,
                    ],
                )
            }
        }
    }

    async fn print_spooled(&self, slip: &str) -> Result<(), DomainError> {
        let spool_file = SpoolFile::create(&self.spool_dir, slip).await?;
        let (program, args) = self.args(Some(&spool_file.path.display().to_string()));
        process::run(program, &args, None).await
    }
}

#[async_trait]
impl PrintStrategy for CommandPrinter {
    fn name(&self) -> &str {
        self.command.name()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn print(&self, payload: &PrintPayload) -> Result<(), DomainError> {
        let slip = ticket_slip::render(payload);

        match self.command {
            PrintCommand::OutPrinter => self.print_spooled(&slip).await,
            PrintCommand::Lp | PrintCommand::Lpr => {
                let (program, args) = self.args(None);
                process::run(program, &args, Some(&slip)).await
            }
        }
    }
}

/// Terminal fallback: logs the slip and reports success
#[derive(Debug, Default)]
pub struct AcknowledgeEcho;

#[async_trait]
impl PrintStrategy for AcknowledgeEcho {
    fn name(&self) -> &str {
        "acknowledge-echo"
    }

    async fn print(&self, payload: &PrintPayload) -> Result<(), DomainError> {
        tracing::info!(
            ticket = %payload.ticket_number,
            department = %payload.department_name,
            "🧾 No printer accepted the slip, acknowledged without printing\n{}",
            ticket_slip::render(payload)
        );
        Ok(())
    }
}
