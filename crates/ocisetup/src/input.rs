//! Operator input for `ocisetup setup`
//!
//! Answers come from command line flags first, then from the terminal.
//! `q`, `quit` or EOF cancel the run.

use anyhow::bail;
use colored::Colorize;
use ocisetup_core::{Notice, Prompt};
use std::io::{self, BufRead, Write};

/// Answers supplied up front. Each one is used at most once, so a rejected
/// flag value falls back to the terminal instead of looping.
#[derive(Debug, Clone, Default)]
pub struct Presets {
    pub overwrite: Option<bool>,
    pub user: Option<String>,
    pub tenancy: Option<String>,
    pub region: Option<String>,
    pub compartment: Option<String>,
    /// `Some(true)` generates a new pair, `Some(false)` reuses `key_file`
    pub generate: Option<bool>,
    pub key_file: Option<String>,
    pub registered: Option<bool>,
}

impl Presets {
    fn take(&mut self, prompt: &Prompt) -> Option<String> {
        let yes_no = |answer: bool| (if answer { "y" } else { "n" }).to_string();
        match prompt {
            Prompt::ConfirmOverwrite { .. } => self.overwrite.take().map(yes_no),
            Prompt::User => self.user.take(),
            Prompt::Tenancy => self.tenancy.take(),
            Prompt::Region => self.region.take(),
            Prompt::Compartment => self.compartment.take(),
            Prompt::KeySource => self.generate.take().map(yes_no),
            Prompt::ExistingKeyPath => self.key_file.take(),
            Prompt::KeyRegistered { .. } => self.registered.take().map(yes_no),
        }
    }
}

/// Fallback used with `--non-interactive` when no flag answers a prompt
fn unattended_default(prompt: &Prompt) -> Option<&'static str> {
    match prompt {
        Prompt::ConfirmOverwrite { .. } => Some("n"),
        Prompt::Compartment => Some(""),
        Prompt::KeySource => Some("generate"),
        _ => None,
    }
}

fn flag_for(prompt: &Prompt) -> &'static str {
    match prompt {
        Prompt::ConfirmOverwrite { .. } | Prompt::KeyRegistered { .. } => "--yes",
        Prompt::User => "--user",
        Prompt::Tenancy => "--tenancy",
        Prompt::Region => "--region",
        Prompt::Compartment => "--compartment",
        Prompt::KeySource => "--generate or --key-file",
        Prompt::ExistingKeyPath => "--key-file",
    }
}

pub struct Operator<R> {
    presets: Presets,
    non_interactive: bool,
    reader: R,
}

impl<R: BufRead> Operator<R> {
    pub fn new(presets: Presets, non_interactive: bool, reader: R) -> Self {
        Self {
            presets,
            non_interactive,
            reader,
        }
    }

    /// Answer `prompt`. `Ok(None)` means the operator cancelled.
    pub fn answer(
        &mut self,
        prompt: &Prompt,
        notice: Option<&Notice>,
    ) -> anyhow::Result<Option<String>> {
        let rejected = matches!(
            notice,
            Some(
                Notice::Invalid(_)
                    | Notice::Unrecognized(_)
                    | Notice::RegistrationPending
                    | Notice::KeyExists(_)
            )
        );
        if let Some(notice) = notice {
            show_notice(notice);
        }
        if !rejected {
            show_context(prompt);
        }

        // A generated key has to be registered before the config is written,
        // which nobody can confirm in an unattended run without --yes
        if self.non_interactive
            && !rejected
            && matches!(prompt, Prompt::KeySource)
            && self.presets.generate != Some(false)
            && self.presets.registered.is_none()
        {
            bail!(
                "--yes is required with --non-interactive when generating a key; \
                 pass --key-file to reuse an already registered key"
            );
        }

        if let Some(answer) = self.presets.take(prompt) {
            println!("{}: {}", prompt.question().bold(), answer.dimmed());
            return Ok(Some(answer));
        }

        if self.non_interactive {
            if rejected {
                bail!(
                    "{} was rejected and --non-interactive is set",
                    flag_for(prompt)
                );
            }
            if let Some(answer) = unattended_default(prompt) {
                return Ok(Some(answer.to_string()));
            }
            bail!("{} is required with --non-interactive", flag_for(prompt));
        }

        self.read_line(prompt)
    }

    fn read_line(&mut self, prompt: &Prompt) -> anyhow::Result<Option<String>> {
        print!("{} ", format!("{}:", prompt.question()).bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if self.reader.read_line(&mut input)? == 0 {
            println!();
            return Ok(None);
        }

        let input = input.trim();
        if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        Ok(Some(input.to_string()))
    }
}

fn show_notice(notice: &Notice) {
    match notice {
        Notice::Warning(w) => println!("{} {}", "⚠".yellow(), w.to_string().yellow()),
        other => println!("{} {}", "✗".red(), other.to_string().red()),
    }
}

/// Extra information printed the first time a prompt is shown
fn show_context(prompt: &Prompt) {
    match prompt {
        Prompt::ConfirmOverwrite {
            existing: Some(record),
            ..
        } => {
            println!("{}", "Current profile [DEFAULT]:".bold());
            println!("  user:        {}", record.user);
            println!("  tenancy:     {}", record.tenancy);
            println!("  region:      {}", record.region);
            println!("  fingerprint: {}", record.fingerprint);
        }
        Prompt::KeyRegistered {
            public_key_path,
            public_key_pem,
            fingerprint,
        } => {
            println!();
            println!(
                "Upload {} in the console under User settings > API keys:",
                public_key_path.display().to_string().cyan()
            );
            println!();
            print!("{}", public_key_pem);
            println!();
            println!("Expected fingerprint: {}", fingerprint.to_string().green());
        }
        _ => {}
    }
}
