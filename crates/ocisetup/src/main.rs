mod commands;
mod input;
mod setup;

use clap::{Args, Parser, Subcommand};
use ocisetup_config::{Overrides, Settings};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ocisetup")]
#[command(about = "Provision an OCI API signing key and ~/.oci/config", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file to read and write
    #[arg(long, global = true, env = "OCI_CLI_CONFIG_FILE", value_name = "PATH")]
    config: Option<String>,
    /// Directory for generated key files (defaults to the config file's directory)
    #[arg(long, global = true, env = "OCISETUP_KEY_DIR", value_name = "DIR")]
    key_dir: Option<String>,
    /// RSA modulus size for generated keys
    #[arg(long, global = true, value_name = "BITS")]
    key_bits: Option<usize>,
    /// oci CLI used for verification
    #[arg(long, global = true, env = "OCISETUP_OCI_BIN", value_name = "PATH")]
    oci_bin: Option<String>,
    /// Give up on verification after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    verify_timeout: Option<u64>,
}

impl GlobalArgs {
    fn into_overrides(self) -> Overrides {
        Overrides {
            config_file: self.config,
            key_dir: self.key_dir,
            key_bits: self.key_bits,
            oci_bin: self.oci_bin,
            verify_timeout: self.verify_timeout.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Collect identity, acquire a key and write the config
    Setup(commands::setup::SetupArgs),
    /// Show the current config record
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the fingerprint of a private key
    Fingerprint {
        /// PEM private key (PKCS#1 or PKCS#8)
        key_file: String,
    },
    /// Check the current config against the oci CLI
    Verify,
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries prompts and results, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    // These two never touch ~/.oci, so they run without resolving settings
    match &cli.command {
        Commands::Version => {
            println!("ocisetup {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Fingerprint { key_file } => {
            let base_dir = std::env::current_dir()?;
            // home is only consulted for a leading ~
            let home = ocisetup_config::home_dir();
            let path = ocisetup_config::resolve_path(key_file, home.as_deref(), &base_dir)?;
            return commands::fingerprint::handle(&path);
        }
        _ => {}
    }

    let settings = Settings::resolve(cli.global.into_overrides())?;
    tracing::debug!(config = %settings.config_file.display(), "settings resolved");

    match cli.command {
        Commands::Setup(args) => commands::setup::handle(&settings, args).await?,
        Commands::Show { json } => commands::show::handle(&settings, json)?,
        Commands::Verify => commands::verify::handle(&settings).await?,
        Commands::Version | Commands::Fingerprint { .. } => {
            unreachable!("handled before settings are resolved");
        }
    }

    Ok(())
}
