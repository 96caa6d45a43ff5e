//! Certificate decoding and the fields the signature and QR code need from it.
//!
//! Everything here works on the exact DER bytes ZATCA issued. Nothing is re-encoded before it is
//! hashed or scanned.
use crate::config::EnvironmentType;
use crate::crypto::{self, ToolError};
use crate::der::{tag, DerReader};
use base64ct::{Base64, Encoding};
use std::path::PathBuf;
use thiserror::Error;
use x509_cert::{
    der::{pem::{self, PemLabel}, Decode},
    Certificate,
};

/// Issuer DN used when a sandbox certificate cannot be parsed (ZATCA's developer-portal sub-CA).
pub const SANDBOX_FALLBACK_ISSUER: &str = "CN=TSZEINVOICE-SubCA-1, DC=extgazt, DC=gov, DC=local";
/// Serial number paired with [`SANDBOX_FALLBACK_ISSUER`].
pub const SANDBOX_FALLBACK_SERIAL: &str = "379112742831380471835263969587287663520528387";

#[derive(Debug, Error)]
pub enum CertificateParsingError {
    #[error("certificate is neither PEM nor base64 DER: {0}")]
    Encoding(String),
    #[error("malformed certificate DER: {0}")]
    Der(String),
    #[error("no secp256k1 public key found in certificate")]
    PublicKeyNotFound,
    #[error("certificate carries no CA signature")]
    MissingSignature,
    #[error("certificate public key does not match the signing key")]
    KeyMismatch,
    #[error("unexpected certificate tool output: {0}")]
    UnexpectedOutput(String),
    #[error("could not create a temporary directory under '{root}': {source}")]
    TempDir {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("temporary file I/O failed: {0}")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Issuer DN and decimal serial as they appear in `xades:IssuerSerial`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerSerial {
    pub issuer_name: String,
    pub serial_number: String,
}

impl IssuerSerial {
    pub fn sandbox_fallback() -> Self {
        Self {
            issuer_name: SANDBOX_FALLBACK_ISSUER.to_string(),
            serial_number: SANDBOX_FALLBACK_SERIAL.to_string(),
        }
    }
}

/// Recovers issuer and serial from certificate DER.
pub trait CertParser {
    fn issuer_and_serial(&self, der: &[u8]) -> Result<IssuerSerial, CertificateParsingError>;
}

/// In-process [`CertParser`] backed by `x509-cert`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerCertParser;

impl CertParser for DerCertParser {
    fn issuer_and_serial(&self, der: &[u8]) -> Result<IssuerSerial, CertificateParsingError> {
        let cert =
            Certificate::from_der(der).map_err(|e| CertificateParsingError::Der(e.to_string()))?;
        let tbs = &cert.tbs_certificate;
        Ok(IssuerSerial {
            issuer_name: format_issuer(&tbs.issuer.to_string()),
            serial_number: serial_to_decimal(tbs.serial_number.as_bytes()),
        })
    }
}

/// Decode a certificate given as PEM, base64 DER, or ZATCA's `binarySecurityToken`
/// (base64 of the base64 DER text).
pub fn decode_certificate(input: &str) -> Result<Vec<u8>, CertificateParsingError> {
    let input = input.trim();
    if let Some(start) = input.find("-----BEGIN") {
        let (label, der) = pem::decode_vec(input[start..].as_bytes())
            .map_err(|e| CertificateParsingError::Encoding(e.to_string()))?;
        if label != Certificate::PEM_LABEL {
            return Err(CertificateParsingError::Encoding(format!(
                "unexpected PEM label {label:?}"
            )));
        }
        return Ok(der);
    }

    let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = Base64::decode_vec(&compact)
        .map_err(|e| CertificateParsingError::Encoding(e.to_string()))?;
    match bytes.first() {
        Some(0x30) => Ok(bytes),
        Some(_) => {
            let inner = std::str::from_utf8(&bytes)
                .map_err(|_| CertificateParsingError::Encoding("not DER or base64 text".into()))?;
            let der = Base64::decode_vec(inner.trim())
                .map_err(|e| CertificateParsingError::Encoding(e.to_string()))?;
            if der.first() != Some(&0x30) {
                return Err(CertificateParsingError::Encoding(
                    "decoded value is not a DER SEQUENCE".into(),
                ));
            }
            Ok(der)
        }
        None => Err(CertificateParsingError::Encoding("empty certificate".into())),
    }
}

/// `base64(SHA-256(DER))`, the `xades:CertDigest` value.
pub fn certificate_digest(der: &[u8]) -> String {
    crypto::sha256_hash_base64(der)
}

/// Issuer and serial for the signature block.
///
/// Parse failures fall back to [`IssuerSerial::sandbox_fallback`] when `env` tolerates degraded
/// certificates; production always returns the error.
pub fn extract_certificate_issuer_and_serial(
    certificate: &str,
    parser: &dyn CertParser,
    env: EnvironmentType,
) -> Result<IssuerSerial, CertificateParsingError> {
    let parsed = decode_certificate(certificate).and_then(|der| parser.issuer_and_serial(&der));
    match parsed {
        Ok(issuer_serial) => Ok(issuer_serial),
        Err(err) if env.allows_degraded_certificates() => {
            tracing::warn!(
                error = %err,
                environment = %env,
                "certificate issuer/serial unavailable; using sandbox fallback"
            );
            Ok(IssuerSerial::sandbox_fallback())
        }
        Err(err) => Err(err),
    }
}

/// Uncompressed public key (hex, `04`-prefixed) found in a certificate.
///
/// Heuristic: scans the DER for the first 65-byte window that starts with `0x04` and decodes as
/// a valid secp256k1 point. It does not walk the `SubjectPublicKeyInfo` structure.
pub fn extract_public_key_from_certificate(
    certificate: &str,
) -> Result<String, CertificateParsingError> {
    let der = decode_certificate(certificate)?;
    public_key_from_der(&der)
}

fn public_key_from_der(der: &[u8]) -> Result<String, CertificateParsingError> {
    der.windows(65)
        .find(|window| window[0] == 0x04 && k256::PublicKey::from_sec1_bytes(window).is_ok())
        .map(hex::encode)
        .ok_or(CertificateParsingError::PublicKeyNotFound)
}

/// The CA's signature over the certificate (QR tag 9): content of the last BIT STRING in the
/// outer `Certificate` SEQUENCE, without the unused-bits byte.
///
/// Never fails; anything unreadable yields an empty vector.
pub fn extract_certificate_signature(certificate: &str) -> Vec<u8> {
    decode_certificate(certificate)
        .map(|der| signature_from_der(&der))
        .unwrap_or_default()
}

fn signature_from_der(der: &[u8]) -> Vec<u8> {
    let Ok(outer) = DerReader::new(der).read_expected(tag::SEQUENCE) else {
        return Vec::new();
    };
    let mut children = outer.children();
    let mut last = None;
    while !children.is_empty() {
        match children.read_tlv() {
            Ok(tlv) if tlv.tag == tag::BIT_STRING => last = tlv.bit_string_bytes(),
            Ok(_) => {}
            Err(_) => return Vec::new(),
        }
    }
    last.map(<[u8]>::to_vec).unwrap_or_default()
}

/// Everything the signer needs from one certificate, computed once.
#[derive(Debug, Clone)]
pub struct SigningCertificate {
    der: Vec<u8>,
    digest: String,
    issuer_serial: IssuerSerial,
    public_key: Option<String>,
    ca_signature: Vec<u8>,
}

impl SigningCertificate {
    /// Decode and inspect a certificate.
    ///
    /// Outside production a missing public key or CA signature only logs a warning; in
    /// production both are errors, as is an unparsable issuer/serial.
    pub fn load(
        certificate: &str,
        parser: &dyn CertParser,
        env: EnvironmentType,
    ) -> Result<Self, CertificateParsingError> {
        let der = decode_certificate(certificate)?;
        let digest = certificate_digest(&der);
        let issuer_serial = extract_certificate_issuer_and_serial(certificate, parser, env)?;

        let public_key = match public_key_from_der(&der) {
            Ok(key) => Some(key),
            Err(_) if env.allows_degraded_certificates() => {
                tracing::warn!(environment = %env, "certificate public key not found");
                None
            }
            Err(err) => return Err(err),
        };

        let ca_signature = signature_from_der(&der);
        if ca_signature.is_empty() {
            if !env.allows_degraded_certificates() {
                return Err(CertificateParsingError::MissingSignature);
            }
            tracing::warn!(
                environment = %env,
                "certificate CA signature not found; QR tag 9 will be empty"
            );
        }

        tracing::debug!(
            issuer = %issuer_serial.issuer_name,
            serial = %issuer_serial.serial_number,
            "loaded signing certificate"
        );

        Ok(Self {
            der,
            digest,
            issuer_serial,
            public_key,
            ca_signature,
        })
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Base64 DER for `ds:X509Certificate`.
    pub fn der_base64(&self) -> String {
        Base64::encode_string(&self.der)
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn issuer_serial(&self) -> &IssuerSerial {
        &self.issuer_serial
    }

    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    pub fn ca_signature(&self) -> &[u8] {
        &self.ca_signature
    }
}

/// Rewrite an RFC 4514 DN with `", "` between RDNs, leaving escaped commas alone.
pub(crate) fn format_issuer(raw: &str) -> String {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in raw.chars() {
        match c {
            ',' if !escaped => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            '\\' if !escaped => {
                escaped = true;
                current.push(c);
                continue;
            }
            _ => current.push(c),
        }
        escaped = false;
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts.join(", ")
}

/// Decimal digits of an unsigned big-endian serial, by repeated long division by ten.
pub(crate) fn serial_to_decimal(serial: &[u8]) -> String {
    let mut quotient: Vec<u8> = serial.iter().copied().skip_while(|b| *b == 0).collect();
    let mut digits = Vec::new();
    while !quotient.is_empty() {
        let mut remainder = 0u16;
        for byte in quotient.iter_mut() {
            let acc = (remainder << 8) | u16::from(*byte);
            *byte = (acc / 10) as u8;
            remainder = acc % 10;
        }
        digits.push(char::from(b'0' + remainder as u8));
        let zeros = quotient.iter().take_while(|b| **b == 0).count();
        quotient.drain(..zeros);
    }
    if digits.is_empty() {
        return "0".to_string();
    }
    digits.iter().rev().collect()
}

/// Decimal form of a hex serial as printed by `openssl x509 -serial`.
pub(crate) fn serial_hex_to_decimal(hex_serial: &str) -> Result<String, CertificateParsingError> {
    let cleaned: String = hex_serial
        .trim()
        .chars()
        .filter(|c| *c != ':')
        .collect();
    let padded = if cleaned.len() % 2 == 1 {
        format!("0{cleaned}")
    } else {
        cleaned
    };
    let bytes = hex::decode(&padded).map_err(|e| {
        CertificateParsingError::UnexpectedOutput(format!("serial '{hex_serial}': {e}"))
    })?;
    Ok(serial_to_decimal(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::encode_tlv;

    struct FailingParser;

    impl CertParser for FailingParser {
        fn issuer_and_serial(&self, _der: &[u8]) -> Result<IssuerSerial, CertificateParsingError> {
            Err(CertificateParsingError::UnexpectedOutput("boom".into()))
        }
    }

    fn fake_certificate(signature: &[u8]) -> Vec<u8> {
        let mut bits = vec![0x00];
        bits.extend_from_slice(signature);
        let mut body = encode_tlv(tag::SEQUENCE, &encode_tlv(tag::INTEGER, &[0x01]));
        body.extend(encode_tlv(tag::SEQUENCE, &encode_tlv(0x06, &[0x2A])));
        body.extend(encode_tlv(tag::BIT_STRING, &bits));
        encode_tlv(tag::SEQUENCE, &body)
    }

    #[test]
    fn serial_to_decimal_handles_large_values() {
        assert_eq!(serial_to_decimal(&[0x01]), "1");
        assert_eq!(serial_to_decimal(&[0x01, 0x00]), "256");
        assert_eq!(serial_to_decimal(&[0x00, 0x01]), "1");
        assert_eq!(serial_to_decimal(&[0xFF, 0xFF]), "65535");
        assert_eq!(
            serial_hex_to_decimal("1000000000000000000000000000000000000000").expect("serial"),
            "91343852333181432387730302044767688728495783936"
        );
        assert_eq!(serial_hex_to_decimal("0F:FF").expect("serial"), "4095");
        assert_eq!(serial_to_decimal(&[]), "0");
        assert_eq!(serial_to_decimal(&[0x00, 0x00]), "0");
        assert_eq!(
            serial_hex_to_decimal("1100003803c5f74023b3fc5c5f000100003803").expect("serial"),
            SANDBOX_FALLBACK_SERIAL
        );
    }

    #[test]
    fn issuer_gets_comma_space_separators() {
        assert_eq!(
            format_issuer("CN=TSZEINVOICE-SubCA-1,DC=extgazt,DC=gov,DC=local"),
            SANDBOX_FALLBACK_ISSUER
        );
        assert_eq!(format_issuer("CN=A\\, B,O=C"), "CN=A\\, B, O=C");
    }

    #[test]
    fn signature_comes_from_last_top_level_bit_string() {
        let der = fake_certificate(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let b64 = Base64::encode_string(&der);
        assert_eq!(extract_certificate_signature(&b64), vec![0xDE, 0xAD, 0xBE, 0xEF]);

        let long = vec![0x5A; 200];
        let der = fake_certificate(&long);
        assert_eq!(
            extract_certificate_signature(&Base64::encode_string(&der)),
            long
        );
    }

    #[test]
    fn malformed_certificate_yields_empty_signature() {
        let der = fake_certificate(&[0x01; 72]);
        let truncated = Base64::encode_string(&der[..der.len() - 10]);
        assert!(extract_certificate_signature(&truncated).is_empty());
        assert!(extract_certificate_signature("not base64 !!").is_empty());
        assert!(extract_certificate_signature("").is_empty());
    }

    #[test]
    fn binary_security_token_is_unwrapped() {
        let der = fake_certificate(&[0x01]);
        let token = Base64::encode_string(Base64::encode_string(&der).as_bytes());
        assert_eq!(decode_certificate(&token).expect("token"), der);
        let pem = pem::encode_string("CERTIFICATE", pem::LineEnding::LF, &der).expect("pem");
        assert_eq!(decode_certificate(&pem).expect("pem"), der);
    }

    #[test]
    fn pem_with_another_label_is_rejected() {
        let der = fake_certificate(&[0x01]);
        let pem = pem::encode_string("PUBLIC KEY", pem::LineEnding::LF, &der).expect("pem");
        assert!(matches!(
            decode_certificate(&pem),
            Err(CertificateParsingError::Encoding(_))
        ));
    }

    #[test]
    fn public_key_scan_fails_without_a_point() {
        let der = fake_certificate(&[0x04; 80]);
        assert!(matches!(
            extract_public_key_from_certificate(&Base64::encode_string(&der)),
            Err(CertificateParsingError::PublicKeyNotFound)
        ));
    }

    #[test]
    fn public_key_scan_finds_embedded_point() {
        let secret = k256::SecretKey::from_slice(&[0x11; 32]).expect("secret");
        let point =
            k256::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&secret.public_key(), false);
        let mut bits = vec![0x00];
        bits.extend_from_slice(point.as_bytes());
        let der = encode_tlv(tag::SEQUENCE, &encode_tlv(tag::BIT_STRING, &bits));
        let found =
            extract_public_key_from_certificate(&Base64::encode_string(&der)).expect("found");
        assert_eq!(found, hex::encode(point.as_bytes()));
    }

    #[test]
    fn fallback_is_gated_by_environment() {
        let b64 = Base64::encode_string(&fake_certificate(&[0x01]));
        let sandbox =
            extract_certificate_issuer_and_serial(&b64, &FailingParser, EnvironmentType::Sandbox)
                .expect("fallback");
        assert_eq!(sandbox, IssuerSerial::sandbox_fallback());

        assert!(extract_certificate_issuer_and_serial(
            &b64,
            &FailingParser,
            EnvironmentType::Production
        )
        .is_err());
    }

    #[test]
    fn production_load_rejects_degraded_certificates() {
        let b64 = Base64::encode_string(&fake_certificate(&[0x01]));
        assert!(SigningCertificate::load(&b64, &FailingParser, EnvironmentType::Production).is_err());

        let loaded = SigningCertificate::load(&b64, &FailingParser, EnvironmentType::Simulation)
            .expect("degraded load");
        assert_eq!(loaded.public_key(), None);
        assert_eq!(loaded.ca_signature(), &[0x01]);
        assert_eq!(loaded.issuer_serial().serial_number, SANDBOX_FALLBACK_SERIAL);
        assert_eq!(
            loaded.issuer_serial(),
            &extract_certificate_issuer_and_serial(&b64, &FailingParser, EnvironmentType::Simulation)
                .expect("fallback")
        );
        assert_eq!(loaded.der_base64(), b64);
    }
}
