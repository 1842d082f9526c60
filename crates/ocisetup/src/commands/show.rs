use colored::Colorize;
use ocisetup_config::Settings;
use ocisetup_core::ConfigStore;

pub fn handle(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let path = &settings.config_file;
    let record = ConfigStore::new().load(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let Some(record) = record else {
        println!(
            "{}",
            format!("No config found at {}", path.display()).yellow()
        );
        println!("Run `ocisetup setup` to create one.");
        return Ok(());
    };

    println!("{} {}", "Config:".bold(), path.display().to_string().cyan());
    println!("[DEFAULT]");
    println!("  user:          {}", record.user);
    println!("  tenancy:       {}", record.tenancy);
    println!("  region:        {}", record.region);
    if !record.region.is_known() {
        println!("                 {}", "(not a known region)".yellow());
    }
    println!("  fingerprint:   {}", record.fingerprint);
    println!("  key_file:      {}", record.key_file.display());
    if let Some(compartment) = &record.compartment {
        println!("  compartment:   {}", compartment);
    }
    if !record.key_file.is_file() {
        println!(
            "{}",
            "Warning: key_file does not exist on this machine".yellow()
        );
    }

    Ok(())
}
