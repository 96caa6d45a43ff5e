//! In-process [`KeyProvider`] built on `k256` and `x509-cert`.
use super::{parse_private_key, CsrGenerationError, KeyGenerationError, KeyPair, KeyProvider};
use crate::csr::CsrConfig;
use k256::ecdsa::{signature::Verifier, DerSignature, Signature, SigningKey};
use x509_cert::{
    builder::{Builder, RequestBuilder},
    der::{pem::LineEnding, Encode, EncodePem},
    request::CertReq,
};

/// Generates keys with the operating system RNG and builds CSRs without spawning processes.
///
/// # Examples
/// ```rust
/// use zatca_core::crypto::{native::NativeKeyProvider, KeyProvider};
///
/// let pair = NativeKeyProvider.generate_key_pair()?;
/// assert_eq!(pair.public_key().len(), 130);
/// # Ok::<(), zatca_core::crypto::KeyGenerationError>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeKeyProvider;

impl NativeKeyProvider {
    /// Build the CSR structure for an already parsed key.
    pub fn build_request(
        &self,
        key: &SigningKey,
        config: &CsrConfig,
    ) -> Result<CertReq, CsrGenerationError> {
        config.validate()?;
        let subject = config.subject()?;
        let template = config.template_extension();
        let san = config.san_extension()?;

        let mut builder = RequestBuilder::new(subject, key)
            .map_err(|e| CsrGenerationError::Build(e.to_string()))?;
        builder
            .add_extension(&template)
            .map_err(|e| CsrGenerationError::Build(format!("template name extension: {e}")))?;
        builder
            .add_extension(&san)
            .map_err(|e| CsrGenerationError::Build(format!("subjectAltName extension: {e}")))?;
        let csr = builder
            .build::<DerSignature>()
            .map_err(|e| CsrGenerationError::Build(e.to_string()))?;

        verify_request(&csr, key)?;
        Ok(csr)
    }
}

fn verify_request(csr: &CertReq, key: &SigningKey) -> Result<(), CsrGenerationError> {
    let info = csr
        .info
        .to_der()
        .map_err(|e| CsrGenerationError::Verification(e.to_string()))?;
    let signature = csr
        .signature
        .as_bytes()
        .ok_or_else(|| CsrGenerationError::Verification("signature has unused bits".into()))?;
    let signature = Signature::from_der(signature)
        .map_err(|e| CsrGenerationError::Verification(e.to_string()))?;
    key.verifying_key()
        .verify(&info, &signature)
        .map_err(|e| CsrGenerationError::Verification(e.to_string()))
}

impl KeyProvider for NativeKeyProvider {
    fn generate_key_pair(&self) -> Result<KeyPair, KeyGenerationError> {
        let key = SigningKey::random(&mut rand::rngs::OsRng);
        let pair = KeyPair::from_signing_key(&key)?;
        tracing::debug!("generated secp256k1 key pair in process");
        Ok(pair)
    }

    fn generate_csr(
        &self,
        private_key: &str,
        config: &CsrConfig,
    ) -> Result<String, CsrGenerationError> {
        let key = parse_private_key(private_key)?;
        let csr = self.build_request(&key, config)?;
        let pem = csr
            .to_pem(LineEnding::LF)
            .map_err(|e| CsrGenerationError::Build(e.to_string()))?;
        tracing::debug!(template = config.template_name(), "generated CSR in process");
        Ok(pem)
    }
}
