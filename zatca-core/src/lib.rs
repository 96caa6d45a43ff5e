//! Cryptographic core for ZATCA Phase 2 e-invoicing: secp256k1 keys, CSRs, certificate
//! inspection, C14N invoice hashing, XAdES signing and QR TLV payloads.
//!
//! # Examples
//! ```rust
//! use zatca_core::config::{Config, EnvironmentType};
//!
//! let config = Config::new(EnvironmentType::Simulation);
//! assert_eq!(config.env().template_name(), "TSTZATCA-Code-Signing");
//! ```
pub mod certificate;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod csr;
pub mod der;
pub mod invoice;

use thiserror::Error;

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Environment(#[from] config::EnvironmentParseError),
    #[error(transparent)]
    Der(#[from] der::DerError),
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    #[error(transparent)]
    KeyGeneration(#[from] crypto::KeyGenerationError),
    #[error(transparent)]
    CsrGeneration(#[from] crypto::CsrGenerationError),
    #[error(transparent)]
    CsrConfig(#[from] csr::CsrConfigError),
    #[error(transparent)]
    Certificate(#[from] certificate::CertificateParsingError),
    #[error(transparent)]
    Credentials(#[from] credentials::CredentialError),
    #[error(transparent)]
    Invoice(#[from] invoice::InvoiceError),
    #[error(transparent)]
    Xml(#[from] invoice::xml::InvoiceXmlError),
    #[error(transparent)]
    Canonicalization(#[from] invoice::canonical::CanonicalizationError),
    #[error(transparent)]
    Signing(#[from] invoice::sign::SigningError),
    #[error(transparent)]
    Qr(#[from] invoice::QrCodeError),
}
