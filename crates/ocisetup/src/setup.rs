//! Step logging for `ocisetup setup`
//!
//! Each phase of a run is printed with a local timestamp and its duration.
//! A successful run ends with a summary of what was written.

use chrono::Local;
use colored::Colorize;
use ocisetup_core::{BackupHandle, Prompt, Provisioned, VerificationStatus};
use std::time::{Duration, Instant};

/// Phases of a provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CollectIdentity,
    AcquireKey,
    PersistRecord,
    VerifyRecord,
}

impl ProvisionStep {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectIdentity => "Collect identity",
            Self::AcquireKey => "Acquire API key",
            Self::PersistRecord => "Write config",
            Self::VerifyRecord => "Verify config",
        }
    }

    /// Phase a prompt belongs to
    pub fn for_prompt(prompt: &Prompt) -> Self {
        match prompt {
            Prompt::ConfirmOverwrite { .. }
            | Prompt::User
            | Prompt::Tenancy
            | Prompt::Region
            | Prompt::Compartment => Self::CollectIdentity,
            Prompt::KeySource | Prompt::ExistingKeyPath | Prompt::KeyRegistered { .. } => {
                Self::AcquireKey
            }
        }
    }
}

pub struct StepLogger {
    start_time: Instant,
    completed: Vec<ProvisionStep>,
    current_step: Option<(ProvisionStep, Instant)>,
}

impl StepLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            completed: Vec::new(),
            current_step: None,
        }
    }

    pub fn current(&self) -> Option<ProvisionStep> {
        self.current_step.map(|(step, _)| step)
    }

    pub fn start_step(&mut self, step: ProvisionStep) {
        println!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), step.name());
        self.current_step = Some((step, Instant::now()));
    }

    /// Close the current step successfully and open `step`, unless it is
    /// already the current one.
    pub fn advance(&mut self, step: ProvisionStep) {
        if self.current() == Some(step) {
            return;
        }
        self.step_success(None);
        self.start_step(step);
    }

    pub fn step_success(&mut self, message: Option<&str>) {
        let Some((step, start)) = self.current_step.take() else {
            return;
        };
        let elapsed = format_elapsed(start.elapsed());
        let text = match message {
            Some(msg) => msg.to_string(),
            None => format!("{} done", step.name()),
        };
        println!(
            "[{}] {} {} ({})",
            timestamp().dimmed(),
            "✓".green().bold(),
            text,
            elapsed.dimmed()
        );
        self.completed.push(step);
    }

    pub fn step_skipped(&mut self, reason: &str) {
        if let Some((step, _)) = self.current_step.take() {
            println!(
                "[{}] {} {} ({})",
                timestamp().dimmed(),
                "⏭".yellow(),
                step.name(),
                reason.dimmed()
            );
        }
    }

    pub fn step_failed(&mut self, error: &str) {
        if let Some((step, _)) = self.current_step.take() {
            println!(
                "[{}] {} {}: {}",
                timestamp().dimmed(),
                "✗".red().bold(),
                step.name(),
                error.red()
            );
        }
    }

    pub fn log_detail(&self, message: &str) {
        println!("[{}]   → {}", timestamp().dimmed(), message.cyan());
    }

    pub fn print_summary(&self, done: &Provisioned) {
        println!();
        println!("{}", "Setup complete".green().bold());
        for (label, value) in summary_rows(done) {
            let value = match label {
                "Config" => value.cyan().bold().to_string(),
                "Fingerprint" => value.green().to_string(),
                "Verification" if done.verification.is_failed() => value.red().to_string(),
                "Verification" => value.green().to_string(),
                _ => value,
            };
            println!("  {:<13} {}", format!("{}:", label), value);
        }
        println!(
            "  {:<13} {}",
            "Elapsed:",
            format_elapsed(self.start_time.elapsed()).dimmed()
        );
    }
}

impl Default for StepLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// What a finished run produced, in display order
fn summary_rows(done: &Provisioned) -> Vec<(&'static str, String)> {
    let backup = match &done.backup {
        BackupHandle::Created(path) => path.display().to_string(),
        BackupHandle::Skipped => "none (no previous config)".to_string(),
    };
    let verification = match &done.verification {
        VerificationStatus::Passed(summary) => format!("passed ({})", summary),
        VerificationStatus::Failed(failure) => format!("failed: {}", failure.0),
        VerificationStatus::Skipped => "skipped".to_string(),
    };

    vec![
        ("Config", done.config_path.display().to_string()),
        ("Key file", done.record.key_file.display().to_string()),
        ("Fingerprint", done.record.fingerprint.to_string()),
        ("Backup", backup),
        ("Verification", verification),
    ]
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else if secs >= 1 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}
