#![allow(deprecated)] // TODO: migrate Command::cargo_bin to cargo_bin_cmd!

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const FIXTURE_FINGERPRINT: &str = "d8:de:a6:75:b1:47:00:53:6a:d9:a1:50:da:68:8b:26";

fn fixture_key() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../ocisetup-core/tests/fixtures/api_key.pem")
}

/// `ocisetup` sandboxed to a temporary home
fn ocisetup(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ocisetup").unwrap();
    cmd.env("HOME", home)
        .env_remove("OCI_CLI_CONFIG_FILE")
        .env_remove("OCISETUP_KEY_DIR")
        .env_remove("OCISETUP_OCI_BIN")
        .env_remove("RUST_LOG");
    cmd
}

fn setup_args(key: &Path) -> Vec<String> {
    [
        "setup",
        "--non-interactive",
        "--no-verify",
        "--user",
        "ocid1.user.oc1..aaaa",
        "--tenancy",
        "ocid1.tenancy.oc1..bbbb",
        "--region",
        "us-phoenix-1",
        "--key-file",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(key.display().to_string()))
    .collect()
}

fn generate_args() -> Vec<&'static str> {
    vec![
        "setup",
        "--non-interactive",
        "--no-verify",
        "--user",
        "ocid1.user.oc1..aaaa",
        "--tenancy",
        "ocid1.tenancy.oc1..bbbb",
        "--region",
        "us-phoenix-1",
        "--generate",
    ]
}

fn backups(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with("config.backup.")
        })
        .count()
}

/// Top-level help lists every subcommand
#[test]
fn test_cli_help() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("fingerprint"))
        .stdout(predicate::str::contains("verify"));
}

/// `version` prints the binary name
#[test]
fn test_cli_version() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ocisetup"));
}

/// `setup --help` documents the unattended flags
#[test]
fn test_setup_help_lists_flags() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(["setup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--key-file"))
        .stdout(predicate::str::contains("--non-interactive"))
        .stdout(predicate::str::contains("--no-verify"));
}

/// `--generate` and `--key-file` are mutually exclusive
#[test]
fn test_generate_conflicts_with_key_file() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(["setup", "--generate", "--key-file", "/tmp/key.pem"])
        .assert()
        .failure();
}

/// `fingerprint` prints the colon-separated MD5 of the public key
#[test]
fn test_fingerprint_of_fixture() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .arg("fingerprint")
        .arg(fixture_key())
        .assert()
        .success()
        .stdout(predicate::str::contains(FIXTURE_FINGERPRINT));
}

/// A missing key file is an error
#[test]
fn test_fingerprint_missing_file() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(["fingerprint", "~/nope.pem"])
        .assert()
        .failure();
}

/// `show` with no config says so, and `--json` prints null
#[test]
fn test_show_without_config() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("No config found"));

    ocisetup(home.path())
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::diff("null\n"));
}

/// Unattended setup with `--key-file` writes a 0600 config
#[test]
fn test_non_interactive_setup_with_existing_key() {
    let home = tempfile::tempdir().unwrap();

    ocisetup(home.path())
        .args(setup_args(&fixture_key()))
        .assert()
        .success();

    let config = home.path().join(".oci/config");
    let written = fs::read_to_string(&config).unwrap();
    assert!(written.starts_with("[DEFAULT]\n"));
    assert!(written.contains("user=ocid1.user.oc1..aaaa\n"));
    assert!(written.contains(&format!("fingerprint={}\n", FIXTURE_FINGERPRINT)));
    assert!(written.contains("region=us-phoenix-1\n"));
    assert!(!written.contains("compartment-id"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&config).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    ocisetup(home.path())
        .args(["show", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tenancy\": \"ocid1.tenancy.oc1..bbbb\""))
        .stdout(predicate::str::contains(FIXTURE_FINGERPRINT));
}

/// A rerun without `--yes` declines the overwrite
#[test]
fn test_rerun_without_yes_keeps_config() {
    let home = tempfile::tempdir().unwrap();
    let oci_dir = home.path().join(".oci");

    ocisetup(home.path())
        .args(setup_args(&fixture_key()))
        .assert()
        .success();
    let before = fs::read_to_string(oci_dir.join("config")).unwrap();

    let mut args = setup_args(&fixture_key());
    args[8] = "eu-frankfurt-1".to_string();
    ocisetup(home.path())
        .args(&args)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing was written"));

    assert_eq!(fs::read_to_string(oci_dir.join("config")).unwrap(), before);
    assert_eq!(backups(&oci_dir), 0);
}

/// A rerun with `--yes` backs up the previous config first
#[test]
fn test_rerun_with_yes_creates_backup() {
    let home = tempfile::tempdir().unwrap();
    let oci_dir = home.path().join(".oci");

    ocisetup(home.path())
        .args(setup_args(&fixture_key()))
        .assert()
        .success();

    let mut args = setup_args(&fixture_key());
    args[8] = "eu-frankfurt-1".to_string();
    args.push("--yes".to_string());
    ocisetup(home.path())
        .args(&args)
        .assert()
        .success();

    assert!(
        fs::read_to_string(oci_dir.join("config"))
            .unwrap()
            .contains("region=eu-frankfurt-1")
    );
    assert_eq!(backups(&oci_dir), 1);
}

/// Unattended setup names the first missing flag
#[test]
fn test_non_interactive_requires_user() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(["setup", "--non-interactive", "--no-verify"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--user"));

    assert!(!home.path().join(".oci/config").exists());
}

/// A wrong OCID type is rejected, not retried
#[test]
fn test_non_interactive_rejects_bad_ocid() {
    let home = tempfile::tempdir().unwrap();
    let mut args = setup_args(&fixture_key());
    args[4] = "ocid1.group.oc1..aaaa".to_string();

    ocisetup(home.path())
        .args(&args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rejected"));
}

/// A missing `--key-file` ends the run with a hint
#[test]
fn test_missing_key_file_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(setup_args(&home.path().join("missing.pem")))
        .assert()
        .failure()
        .stdout(predicate::str::contains("hint:"));

    assert!(!home.path().join(".oci/config").exists());
}

/// Verification failure keeps the config and exits 0
#[test]
fn test_failed_verification_still_succeeds() {
    let home = tempfile::tempdir().unwrap();
    let mut args = setup_args(&fixture_key());
    args.retain(|a| a != "--no-verify");
    args.push("--oci-bin".to_string());
    args.push(home.path().join("no-oci").display().to_string());

    ocisetup(home.path())
        .args(&args)
        .assert()
        .success()
        .stdout(predicate::str::contains("could not be verified"));

    assert!(home.path().join(".oci/config").exists());
}

/// Invalid answers on stdin are asked again
#[test]
fn test_interactive_answers_from_stdin() {
    let home = tempfile::tempdir().unwrap();
    let answers = format!(
        "ocid1.user.oc1..aaaa\nnot-an-ocid\nocid1.tenancy.oc1..bbbb\nmars-north-1\n\nreuse\n{}\n",
        fixture_key().display()
    );

    ocisetup(home.path())
        .args(["setup", "--no-verify"])
        .write_stdin(answers)
        .assert()
        .success()
        .stdout(predicate::str::contains("ocid1.tenancy.oc1."))
        .stdout(predicate::str::contains("mars-north-1"));

    let written = fs::read_to_string(home.path().join(".oci/config")).unwrap();
    assert!(written.contains("tenancy=ocid1.tenancy.oc1..bbbb\n"));
    assert!(written.contains("region=mars-north-1\n"));
}

/// `q` stops the run before anything is written
#[test]
fn test_interactive_quit_writes_nothing() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .args(["setup", "--no-verify"])
        .write_stdin("ocid1.user.oc1..aaaa\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing was written"));

    assert!(!home.path().join(".oci").exists());
}

/// `--config` moves the config away from ~/.oci
#[test]
fn test_explicit_config_path() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("profiles/oci.conf");
    let mut args = vec!["--config".to_string(), config.display().to_string()];
    args.extend(setup_args(&fixture_key()));

    ocisetup(home.path()).args(&args).assert().success();

    assert!(config.is_file());
    assert!(!home.path().join(".oci/config").exists());
}

/// Unattended `--generate --yes` writes the key pair with tight modes and a
/// config whose fingerprint matches the key on disk
#[test]
fn test_non_interactive_generate_writes_key_pair() {
    let home = tempfile::tempdir().unwrap();
    let oci_dir = home.path().join(".oci");
    let mut args = generate_args();
    args.push("--yes");

    ocisetup(home.path())
        .args(&args)
        .assert()
        .success()
        .stdout(predicate::str::contains("Setup complete"))
        .stdout(predicate::str::contains("BEGIN PUBLIC KEY"));

    let private_key = oci_dir.join("oci_api_key.pem");
    let public_key = oci_dir.join("oci_api_key_public.pem");
    assert!(private_key.is_file());
    assert!(public_key.is_file());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&private_key), 0o600);
        assert_eq!(mode(&public_key), 0o644);
        assert_eq!(mode(&oci_dir.join("config")), 0o600);
    }

    let output = ocisetup(home.path())
        .arg("fingerprint")
        .arg(&private_key)
        .output()
        .unwrap();
    assert!(output.status.success());
    let fingerprint = String::from_utf8(output.stdout).unwrap();

    let written = fs::read_to_string(oci_dir.join("config")).unwrap();
    assert!(written.contains(&format!("fingerprint={}\n", fingerprint.trim())));
    assert!(written.contains(&format!("key_file={}\n", private_key.display())));
}

/// Generating unattended without `--yes` fails before any key is written
#[test]
fn test_non_interactive_generate_requires_yes() {
    let home = tempfile::tempdir().unwrap();

    ocisetup(home.path())
        .args(generate_args())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    // no key flag at all means generate, which needs --yes as well
    let mut args = generate_args();
    args.retain(|a| *a != "--generate");
    ocisetup(home.path())
        .args(&args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    assert!(!home.path().join(".oci/oci_api_key.pem").exists());
    assert!(!home.path().join(".oci/oci_api_key_public.pem").exists());
    assert!(!home.path().join(".oci/config").exists());
}

/// `--generate` never replaces a private key that is already there
#[test]
fn test_generate_keeps_existing_private_key() {
    let home = tempfile::tempdir().unwrap();
    let oci_dir = home.path().join(".oci");
    fs::create_dir_all(&oci_dir).unwrap();
    fs::copy(fixture_key(), oci_dir.join("oci_api_key.pem")).unwrap();
    let original = fs::read(oci_dir.join("oci_api_key.pem")).unwrap();

    let mut args = generate_args();
    args.push("--yes");
    ocisetup(home.path())
        .args(&args)
        .assert()
        .failure()
        .stdout(predicate::str::contains("already exists"))
        .stderr(predicate::str::contains("rejected"));

    assert_eq!(fs::read(oci_dir.join("oci_api_key.pem")).unwrap(), original);
    assert!(!oci_dir.join("oci_api_key_public.pem").exists());
    assert!(!oci_dir.join("config").exists());

    // the key that is already there can be reused as is
    ocisetup(home.path())
        .args(setup_args(Path::new("~/.oci/oci_api_key.pem")))
        .assert()
        .success();
    let written = fs::read_to_string(oci_dir.join("config")).unwrap();
    assert!(written.contains(&format!("fingerprint={}\n", FIXTURE_FINGERPRINT)));
}

/// Interactively, choosing to generate over an existing key asks again
#[test]
fn test_interactive_existing_key_is_reused() {
    let home = tempfile::tempdir().unwrap();
    let oci_dir = home.path().join(".oci");
    fs::create_dir_all(&oci_dir).unwrap();
    fs::copy(fixture_key(), oci_dir.join("oci_api_key.pem")).unwrap();

    ocisetup(home.path())
        .args(["setup", "--no-verify"])
        .write_stdin(
            "ocid1.user.oc1..aaaa\nocid1.tenancy.oc1..bbbb\nus-phoenix-1\n\n\nn\n~/.oci/oci_api_key.pem\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let written = fs::read_to_string(oci_dir.join("config")).unwrap();
    assert!(written.contains(&format!("fingerprint={}\n", FIXTURE_FINGERPRINT)));
    assert!(!oci_dir.join("oci_api_key_public.pem").exists());
}

/// Relative `--key-file` and `--config` are written as absolute paths
#[test]
fn test_relative_paths_are_made_absolute() {
    let home = tempfile::tempdir().unwrap();
    let cwd = home.path().canonicalize().unwrap();
    fs::copy(fixture_key(), cwd.join("mine.pem")).unwrap();

    let mut args = vec!["--config".to_string(), "profiles/oci.conf".to_string()];
    args.extend(setup_args(Path::new("mine.pem")));
    ocisetup(home.path())
        .current_dir(&cwd)
        .args(&args)
        .assert()
        .success();

    let written = fs::read_to_string(cwd.join("profiles/oci.conf")).unwrap();
    assert!(written.contains(&format!("key_file={}\n", cwd.join("mine.pem").display())));
}

/// `fingerprint` with an absolute path does not need a home directory
#[test]
fn test_fingerprint_without_home() {
    let home = tempfile::tempdir().unwrap();
    ocisetup(home.path())
        .env_remove("HOME")
        .arg("fingerprint")
        .arg(fixture_key())
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", FIXTURE_FINGERPRINT)));
}
