use crate::input::{Operator, Presets};
use crate::setup::{ProvisionStep, StepLogger};
use clap::Args;
use colored::Colorize;
use ocisetup_cloud_oci::OciVerifier;
use ocisetup_config::Settings;
use ocisetup_core::{
    AbortReason, BackupHandle, KeyPaths, ProvisionOptions, Provisioned, Provisioner, Step,
    VerificationStatus,
};
use std::io;

#[derive(Args, Debug)]
pub struct SetupArgs {
    /// User OCID
    #[arg(long)]
    pub user: Option<String>,
    /// Tenancy OCID
    #[arg(long)]
    pub tenancy: Option<String>,
    /// Home region, e.g. us-phoenix-1
    #[arg(long)]
    pub region: Option<String>,
    /// Compartment OCID written as compartment-id
    #[arg(long)]
    pub compartment: Option<String>,
    /// Generate a new key pair
    #[arg(long, conflicts_with = "key_file")]
    pub generate: bool,
    /// Reuse an existing private key
    #[arg(long, value_name = "PATH")]
    pub key_file: Option<String>,
    /// Overwrite an existing config and assume the public key is registered
    #[arg(short, long)]
    pub yes: bool,
    /// Check the written config with the oci CLI (default)
    #[arg(long, overrides_with = "no_verify")]
    pub verify: bool,
    /// Skip the oci CLI check
    #[arg(long, overrides_with = "verify")]
    pub no_verify: bool,
    /// Fail instead of prompting for missing answers
    #[arg(long)]
    pub non_interactive: bool,
}

impl SetupArgs {
    fn verification_enabled(&self) -> bool {
        self.verify || !self.no_verify
    }

    fn presets(&self) -> Presets {
        let generate = if self.generate {
            Some(true)
        } else if self.key_file.is_some() {
            Some(false)
        } else {
            None
        };

        Presets {
            overwrite: self.yes.then_some(true),
            user: self.user.clone(),
            tenancy: self.tenancy.clone(),
            region: self.region.clone(),
            compartment: self.compartment.clone(),
            generate,
            key_file: self.key_file.clone(),
            registered: self.yes.then_some(true),
        }
    }
}

pub async fn handle(settings: &Settings, args: SetupArgs) -> anyhow::Result<()> {
    let options = ProvisionOptions {
        config_path: settings.config_file.clone(),
        key_paths: KeyPaths {
            private_key: settings.private_key.clone(),
            public_key: settings.public_key.clone(),
        },
        key_bits: settings.key_bits,
        home_dir: settings.home_dir.clone(),
        base_dir: settings.base_dir.clone(),
    };

    let stdin = io::stdin();
    let mut operator = Operator::new(args.presets(), args.non_interactive, stdin.lock());
    let mut logger = StepLogger::new();
    let mut run = Provisioner::new(options);

    println!("{}", "OCI API credential setup (q to quit)".blue().bold());
    logger.start_step(ProvisionStep::CollectIdentity);

    let mut step = run.start();
    let done = loop {
        match step {
            Step::Input { prompt, notice } => {
                logger.advance(ProvisionStep::for_prompt(&prompt));
                let Some(answer) = operator.answer(&prompt, notice.as_ref())? else {
                    step = run.cancel();
                    continue;
                };
                step = match run.submit(&answer) {
                    Ok(next) => next,
                    Err(e) => {
                        logger.step_failed(&e.to_string());
                        if let Some(hint) = e.hint() {
                            println!("  {} {}", "hint:".yellow(), hint);
                        }
                        return Err(e.into());
                    }
                };
            }
            Step::Aborted(reason) => {
                logger.step_skipped(match reason {
                    AbortReason::OverwriteDeclined => "existing config kept",
                    AbortReason::Cancelled => "cancelled",
                });
                println!("{}", "Setup stopped; nothing was written.".yellow());
                return Ok(());
            }
            Step::Provisioned(done) => break *done,
        }
    };

    logger.step_success(Some(&key_summary(&done)));
    logger.start_step(ProvisionStep::PersistRecord);
    if let BackupHandle::Created(backup) = &done.backup {
        logger.log_detail(&format!("previous config saved to {}", backup.display()));
    }
    logger.step_success(Some(&format!("wrote {}", done.config_path.display())));

    let done = verify(settings, &args, done, &mut logger).await;

    logger.print_summary(&done);
    if done.verification.is_failed() {
        println!(
            "{}",
            "The config was written but could not be verified. Check the values above and run `ocisetup verify` once the key is registered.".yellow()
        );
    }
    Ok(())
}

fn key_summary(done: &Provisioned) -> String {
    let origin = if done.key.is_generated() {
        "generated"
    } else {
        "using"
    };
    format!(
        "{} {} ({})",
        origin,
        done.key.private_key_path.display(),
        done.record.fingerprint
    )
}

async fn verify(
    settings: &Settings,
    args: &SetupArgs,
    done: Provisioned,
    logger: &mut StepLogger,
) -> Provisioned {
    logger.start_step(ProvisionStep::VerifyRecord);
    if !args.verification_enabled() {
        logger.step_skipped("--no-verify");
        return done;
    }

    let verifier = OciVerifier::new(settings.oci_bin.clone(), settings.verify_timeout);
    let done = done.verify(&verifier).await;
    match &done.verification {
        VerificationStatus::Passed(summary) => logger.step_success(Some(summary)),
        VerificationStatus::Failed(failure) => logger.step_failed(&failure.to_string()),
        VerificationStatus::Skipped => logger.step_skipped("no verifier"),
    }
    done
}
