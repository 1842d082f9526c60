use anyhow::Context;
use colored::Colorize;
use ocisetup_cloud_oci::OciVerifier;
use ocisetup_config::Settings;
use ocisetup_core::{ConfigStore, RecordVerifier};

pub async fn handle(settings: &Settings) -> anyhow::Result<()> {
    let path = &settings.config_file;
    let record = ConfigStore::new()
        .load(path)?
        .with_context(|| format!("no config at {}, run `ocisetup setup` first", path.display()))?;

    println!("{}", "Verifying config with the oci CLI...".blue());
    let verifier = OciVerifier::new(settings.oci_bin.clone(), settings.verify_timeout);
    let summary = verifier.verify(&record, path).await?;

    println!("{} {}", "✓".green().bold(), summary);
    Ok(())
}
