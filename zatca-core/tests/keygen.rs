mod common;

use common::{csr_config, openssl_available};
use std::path::{Path, PathBuf};
use zatca_core::config::{Config, EnvironmentType};
use zatca_core::crypto::openssl::TEMP_PREFIX;
use zatca_core::crypto::{self, CsrGenerationError, KeyGenerationError, ToolError};

fn scratch_entries(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .expect("read temp root")
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(TEMP_PREFIX))
        .collect()
}

#[test]
fn failed_key_generation_leaves_no_scratch_directory() {
    let root = tempfile::tempdir().expect("temp root");
    let config = Config::new(EnvironmentType::Sandbox)
        .with_openssl_path("/nonexistent/zatca-openssl")
        .with_temp_root(root.path());

    let err = crypto::generate_key_pair(&config).expect_err("missing tool");
    assert!(matches!(
        err,
        KeyGenerationError::Tool(ToolError::Unavailable { .. })
    ));
    assert!(scratch_entries(root.path()).is_empty());
}

#[test]
fn failed_csr_generation_leaves_no_scratch_directory() {
    let root = tempfile::tempdir().expect("temp root");
    let config = Config::new(EnvironmentType::Sandbox)
        .with_openssl_path("/nonexistent/zatca-openssl")
        .with_temp_root(root.path());

    let err = crypto::generate_csr(
        &config,
        common::TEST_PRIVATE_KEY,
        &csr_config(EnvironmentType::Sandbox),
    )
    .expect_err("missing tool");
    assert!(matches!(
        err,
        CsrGenerationError::Tool(ToolError::Unavailable { .. })
    ));
    assert!(scratch_entries(root.path()).is_empty());
}

/// Exits successfully, writes junk to any `-out` file and prints text no real openssl would.
#[cfg(unix)]
const JUNK_OPENSSL: &str = r#"#!/bin/sh
prev=""
for arg in "$@"; do
  if [ "$prev" = "-out" ]; then echo "not a key" > "$arg"; fi
  prev="$arg"
done
echo "unexpected output"
"#;

#[cfg(unix)]
fn junk_openssl(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("openssl");
    std::fs::write(&path, JUNK_OPENSSL).expect("write stand-in");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    path
}

#[cfg(unix)]
#[test]
fn unparsable_key_output_leaves_no_scratch_directory() {
    let bin = tempfile::tempdir().expect("bin dir");
    let root = tempfile::tempdir().expect("temp root");
    let config = Config::new(EnvironmentType::Sandbox)
        .with_openssl_path(junk_openssl(bin.path()))
        .with_temp_root(root.path());

    let err = crypto::generate_key_pair(&config).expect_err("junk output");
    assert!(
        matches!(err, KeyGenerationError::UnparsableOutput(_)),
        "unexpected error: {err}"
    );
    assert!(scratch_entries(root.path()).is_empty());
}

#[cfg(unix)]
#[test]
fn unverifiable_csr_output_leaves_no_scratch_directory() {
    let bin = tempfile::tempdir().expect("bin dir");
    let root = tempfile::tempdir().expect("temp root");
    let config = Config::new(EnvironmentType::Sandbox)
        .with_openssl_path(junk_openssl(bin.path()))
        .with_temp_root(root.path());

    let err = crypto::generate_csr(
        &config,
        common::TEST_PRIVATE_KEY,
        &csr_config(EnvironmentType::Sandbox),
    )
    .expect_err("junk output");
    assert!(
        matches!(err, CsrGenerationError::Verification(_)),
        "unexpected error: {err}"
    );
    assert!(scratch_entries(root.path()).is_empty());
}

#[test]
fn unusable_temp_root_is_reported() {
    let config = Config::new(EnvironmentType::Sandbox)
        .with_temp_root("/nonexistent/zatca-temp-root");
    assert!(matches!(
        crypto::generate_key_pair(&config),
        Err(KeyGenerationError::TempDir { .. })
    ));
}

#[test]
fn openssl_key_pair_signs_and_verifies() {
    if !openssl_available() {
        eprintln!("skipping: openssl not found");
        return;
    }
    let root = tempfile::tempdir().expect("temp root");
    let config = Config::new(EnvironmentType::Sandbox).with_temp_root(root.path());

    let pair = crypto::generate_key_pair(&config).expect("key pair");
    assert_eq!(pair.private_key().len(), 64);
    assert_eq!(pair.public_key().len(), 130);
    assert!(pair.public_key().starts_with("04"));
    assert!(pair.private_key_pem().contains("PRIVATE KEY"));

    let signature = crypto::sign_data(pair.private_key(), "invoice").expect("sign");
    assert!(crypto::verify_signature(pair.public_key(), "invoice", &signature));
    assert!(!crypto::verify_signature(pair.public_key(), "tampered", &signature));
    assert_eq!(crypto::public_key_raw_bytes(pair.public_key()).expect("raw").len(), 64);

    assert!(scratch_entries(root.path()).is_empty());
}
