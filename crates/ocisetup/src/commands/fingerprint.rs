use std::path::Path;

pub fn handle(key_file: &Path) -> anyhow::Result<()> {
    let fingerprint = ocisetup_core::fingerprint_file(key_file)?;
    println!("{}", fingerprint);
    Ok(())
}
