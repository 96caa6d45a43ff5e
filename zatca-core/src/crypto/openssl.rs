//! OpenSSL CLI backed [`KeyProvider`] and [`CertParser`].
//!
//! Every operation runs inside its own `zatca-*` directory under [`Config::temp_root`]. The
//! directory is a [`tempfile::TempDir`], so it is removed when the operation returns, whether it
//! succeeded or failed.
use super::{
    parse_private_key, private_key_pem, public_key_hex, CsrGenerationError, KeyGenerationError,
    KeyPair, KeyProvider,
};
use crate::certificate::{
    format_issuer, serial_hex_to_decimal, CertParser, CertificateParsingError, IssuerSerial,
};
use crate::config::Config;
use crate::csr::CsrConfig;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};
use tempfile::TempDir;
use thiserror::Error;

/// Failure to run the external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{program}' could not be started: {source}")]
    Unavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{command}' exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Prefix of every scratch directory this module creates.
pub const TEMP_PREFIX: &str = "zatca-";

fn scratch_dir(root: &Path) -> std::io::Result<TempDir> {
    tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir_in(root)
}

fn run<I, S>(program: &Path, args: I) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
    let command = std::iter::once(program.as_os_str())
        .chain(args.iter().map(|a| a.as_os_str()))
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(%command, "running openssl");

    let output = Command::new(program)
        .args(&args)
        .output()
        .map_err(|source| ToolError::Unavailable {
            program: program.to_path_buf(),
            source,
        })?;
    if !output.status.success() {
        return Err(ToolError::Failed {
            command,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Extract the colon-separated hex block that follows `label` in `openssl ec -text` output.
fn hex_block(text: &str, label: &str) -> Option<Vec<u8>> {
    let mut lines = text.lines().skip_while(|line| line.trim() != label);
    lines.next()?;
    let hex: String = lines
        .take_while(|line| line.starts_with(char::is_whitespace))
        .flat_map(|line| line.trim().split(':'))
        .collect();
    if hex.is_empty() {
        return None;
    }
    hex::decode(hex).ok()
}

/// Raw private scalar (32 bytes) and uncompressed public point (65 bytes) from
/// `openssl ec -text -noout`.
pub(crate) fn parse_ec_text(text: &str) -> Result<(Vec<u8>, Vec<u8>), KeyGenerationError> {
    let private = hex_block(text, "priv:")
        .ok_or_else(|| KeyGenerationError::UnparsableOutput("missing priv: block".into()))?;
    let public = hex_block(text, "pub:")
        .ok_or_else(|| KeyGenerationError::UnparsableOutput("missing pub: block".into()))?;

    let private = match private.as_slice() {
        [0x00, rest @ ..] if rest.len() == 32 => rest.to_vec(),
        bytes if bytes.len() <= 32 => {
            let mut padded = vec![0u8; 32 - bytes.len()];
            padded.extend_from_slice(bytes);
            padded
        }
        bytes => {
            return Err(KeyGenerationError::UnparsableOutput(format!(
                "private key is {} bytes",
                bytes.len()
            )))
        }
    };
    if public.len() != 65 || public[0] != 0x04 {
        return Err(KeyGenerationError::UnparsableOutput(format!(
            "public key is not an uncompressed point ({} bytes)",
            public.len()
        )));
    }
    Ok((private, public))
}

/// Key pairs and CSRs produced by the `openssl` binary named in [`Config`].
#[derive(Debug, Clone)]
pub struct OpensslKeyProvider {
    config: Config,
}

impl OpensslKeyProvider {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    fn openssl(&self) -> &Path {
        self.config.openssl_path()
    }
}

impl KeyProvider for OpensslKeyProvider {
    fn generate_key_pair(&self) -> Result<KeyPair, KeyGenerationError> {
        let root = self.config.temp_root();
        let dir = scratch_dir(root).map_err(|source| KeyGenerationError::TempDir {
            root: root.to_path_buf(),
            source,
        })?;
        let key_path = dir.path().join("private.pem");

        run(
            self.openssl(),
            [
                OsStr::new("ecparam"),
                OsStr::new("-name"),
                OsStr::new("secp256k1"),
                OsStr::new("-genkey"),
                OsStr::new("-noout"),
                OsStr::new("-out"),
                key_path.as_os_str(),
            ],
        )?;
        let text = run(
            self.openssl(),
            [
                OsStr::new("ec"),
                OsStr::new("-in"),
                key_path.as_os_str(),
                OsStr::new("-text"),
                OsStr::new("-noout"),
            ],
        )?;
        let (private, public) = parse_ec_text(&String::from_utf8_lossy(&text.stdout))?;
        let pem = fs::read_to_string(&key_path).map_err(KeyGenerationError::Io)?;

        // The printed scalar and the PEM must describe the same key.
        let key = parse_private_key(&pem)?;
        if key.to_bytes().as_slice() != private.as_slice()
            || public_key_hex(key.verifying_key()) != hex::encode(&public)
        {
            return Err(KeyGenerationError::UnparsableOutput(
                "printed key does not match the generated PEM".into(),
            ));
        }

        tracing::debug!("generated secp256k1 key pair with openssl");
        Ok(KeyPair::from_parts(
            hex::encode(&private),
            hex::encode(&public),
            pem,
        ))
    }

    fn generate_csr(
        &self,
        private_key: &str,
        config: &CsrConfig,
    ) -> Result<String, CsrGenerationError> {
        config.validate()?;
        let pem = private_key_pem(private_key)?;

        let root = self.config.temp_root();
        let dir = scratch_dir(root).map_err(|source| CsrGenerationError::TempDir {
            root: root.to_path_buf(),
            source,
        })?;
        let key_path = dir.path().join("private.pem");
        let config_path = dir.path().join("csr.cnf");
        let csr_path = dir.path().join("csr.pem");
        fs::write(&key_path, pem.as_bytes()).map_err(CsrGenerationError::Io)?;
        fs::write(&config_path, config.openssl_config()).map_err(CsrGenerationError::Io)?;

        run(
            self.openssl(),
            [
                OsStr::new("req"),
                OsStr::new("-new"),
                OsStr::new("-sha256"),
                OsStr::new("-key"),
                key_path.as_os_str(),
                OsStr::new("-config"),
                config_path.as_os_str(),
                OsStr::new("-out"),
                csr_path.as_os_str(),
            ],
        )?;
        let csr = fs::read_to_string(&csr_path).map_err(CsrGenerationError::Io)?;

        let verify = run(
            self.openssl(),
            [
                OsStr::new("req"),
                OsStr::new("-in"),
                csr_path.as_os_str(),
                OsStr::new("-noout"),
                OsStr::new("-verify"),
            ],
        )
        .map_err(|e| CsrGenerationError::Verification(e.to_string()))?;
        let report = format!(
            "{}{}",
            String::from_utf8_lossy(&verify.stdout),
            String::from_utf8_lossy(&verify.stderr)
        );
        if !report.contains("verify OK") {
            return Err(CsrGenerationError::Verification(report.trim().to_string()));
        }

        tracing::debug!(template = config.template_name(), "generated CSR with openssl");
        Ok(csr)
    }
}

/// [`CertParser`] that asks `openssl x509` for the issuer and serial.
#[derive(Debug, Clone)]
pub struct OpensslCertParser {
    config: Config,
}

impl OpensslCertParser {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl CertParser for OpensslCertParser {
    fn issuer_and_serial(&self, der: &[u8]) -> Result<IssuerSerial, CertificateParsingError> {
        let root = self.config.temp_root();
        let dir = scratch_dir(root).map_err(|source| CertificateParsingError::TempDir {
            root: root.to_path_buf(),
            source,
        })?;
        let cert_path = dir.path().join("certificate.der");
        fs::write(&cert_path, der).map_err(CertificateParsingError::Io)?;

        let output = run(
            self.config.openssl_path(),
            [
                OsStr::new("x509"),
                OsStr::new("-inform"),
                OsStr::new("DER"),
                OsStr::new("-in"),
                cert_path.as_os_str(),
                OsStr::new("-noout"),
                OsStr::new("-issuer"),
                OsStr::new("-serial"),
                OsStr::new("-nameopt"),
                OsStr::new("RFC2253"),
            ],
        )?;
        parse_issuer_serial(&String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_issuer_serial(text: &str) -> Result<IssuerSerial, CertificateParsingError> {
    let field = |name: &str| {
        text.lines()
            .find_map(|line| line.trim().strip_prefix(name))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                CertificateParsingError::UnexpectedOutput(format!("missing '{name}' in {text:?}"))
            })
    };
    Ok(IssuerSerial {
        issuer_name: format_issuer(field("issuer=")?),
        serial_number: serial_hex_to_decimal(field("serial=")?)?,
    })
}
