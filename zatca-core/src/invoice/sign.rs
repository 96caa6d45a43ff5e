//! Enveloped XAdES signing of a finalized invoice.
//!
//! Signing walks a fixed sequence of states, each a separate type:
//! [`UnsignedInvoice`] → [`HashedInvoice`] → [`PropertiesSigned`] → [`SignatureEmbedded`] →
//! [`SignedInvoiceResult`]. Any failing step aborts the whole run; there is no partially signed
//! document.
use crate::certificate::{CertParser, CertificateParsingError, SigningCertificate};
use crate::config::EnvironmentType;
use crate::crypto::{self, CryptoError};
use crate::invoice::canonical::{invoice_hash_input, CanonicalizationError};
use crate::invoice::qr::{generate_phase2_qr, Phase1QrFields, Phase2QrFields, QrCodeError};
use crate::invoice::xml::signature::{
    signed_info_xml, signed_properties_xml, ubl_extensions_xml, SignedPropertiesFields,
};
use crate::invoice::xml::{self, InvoiceXmlError};
use crate::invoice::{format_amount, FinalizedInvoice, VatId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error(transparent)]
    Certificate(#[from] CertificateParsingError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),
    #[error(transparent)]
    Xml(#[from] InvoiceXmlError),
    #[error(transparent)]
    QrCode(#[from] QrCodeError),
}

type Result<T> = std::result::Result<T, SigningError>;

/// The only artefact persisted next to a signed invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInvoiceResult {
    xml: String,
    invoice_hash: String,
    signature: String,
    qr_base64: String,
}

impl SignedInvoiceResult {
    /// Signed UBL document.
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// base64 SHA-256 of the canonical invoice; the next invoice's PIH.
    pub fn invoice_hash(&self) -> &str {
        &self.invoice_hash
    }

    /// base64 DER ECDSA signature over `SignedInfo`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn qr_base64(&self) -> &str {
        &self.qr_base64
    }

    pub fn into_xml(self) -> String {
        self.xml
    }
}

/// Rendered document, nothing computed yet.
#[derive(Debug)]
pub struct UnsignedInvoice<'a> {
    invoice: &'a FinalizedInvoice,
    xml: String,
}

impl<'a> UnsignedInvoice<'a> {
    pub fn new(invoice: &'a FinalizedInvoice) -> Result<Self> {
        let xml = xml::unsigned_invoice_xml(invoice)?;
        Ok(Self { invoice, xml })
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Canonicalize the hash input and digest it.
    pub fn compute_hash(self) -> Result<HashedInvoice<'a>> {
        let canonical = invoice_hash_input(&self.xml)?;
        let hash_hex = crypto::sha256_hash(&canonical);
        let hash_base64 = crypto::sha256_hash_base64(&canonical);
        debug!(invoice = self.invoice.data().id(), hash = %hash_base64, "computed invoice hash");
        Ok(HashedInvoice {
            invoice: self.invoice,
            xml: self.xml,
            hash_hex,
            hash_base64,
        })
    }
}

#[derive(Debug)]
pub struct HashedInvoice<'a> {
    invoice: &'a FinalizedInvoice,
    xml: String,
    hash_hex: String,
    hash_base64: String,
}

impl<'a> HashedInvoice<'a> {
    /// Hex digest, for QR tag 6.
    pub fn hash_hex(&self) -> &str {
        &self.hash_hex
    }

    /// base64 digest, for `ds:DigestValue`.
    pub fn hash_base64(&self) -> &str {
        &self.hash_base64
    }

    /// Build the XAdES `SignedProperties` for `certificate` and digest its linearized form.
    pub fn sign_properties(self, certificate: &SigningCertificate) -> PropertiesSigned<'a> {
        let signing_time = self.invoice.data().signing_time();
        let issuer_serial = certificate.issuer_serial();
        let signed_properties = signed_properties_xml(&SignedPropertiesFields {
            signing_time: &signing_time,
            certificate_digest: certificate.digest(),
            issuer_name: &issuer_serial.issuer_name,
            serial_number: &issuer_serial.serial_number,
        });
        let properties_digest = crypto::sha256_hash_base64(&signed_properties);
        debug!(signing_time = %signing_time, digest = %properties_digest, "built signed properties");
        PropertiesSigned {
            hashed: self,
            signing_time,
            signed_properties,
            properties_digest,
        }
    }
}

#[derive(Debug)]
pub struct PropertiesSigned<'a> {
    hashed: HashedInvoice<'a>,
    signing_time: String,
    signed_properties: String,
    properties_digest: String,
}

impl<'a> PropertiesSigned<'a> {
    pub fn signed_properties(&self) -> &str {
        &self.signed_properties
    }

    pub fn properties_digest(&self) -> &str {
        &self.properties_digest
    }

    /// Sign `SignedInfo` and splice the signature block into the extensions placeholder.
    pub fn embed_signature(
        self,
        private_key: &str,
        certificate: &SigningCertificate,
    ) -> Result<SignatureEmbedded<'a>> {
        let signed_info = signed_info_xml(&self.hashed.hash_base64, &self.properties_digest);
        let signature = crypto::sign_hash(private_key, &crypto::sha256_hash(&signed_info))?;
        let block = ubl_extensions_xml(
            &signed_info,
            &signature,
            &certificate.der_base64(),
            &self.signed_properties,
        );
        let xml = xml::embed_signature(&self.hashed.xml, &block)?;
        debug!(invoice = self.hashed.invoice.data().id(), "embedded signature");
        Ok(SignatureEmbedded {
            invoice: self.hashed.invoice,
            xml,
            hash_hex: self.hashed.hash_hex,
            hash_base64: self.hashed.hash_base64,
            signing_time: self.signing_time,
            signature,
        })
    }
}

#[derive(Debug)]
pub struct SignatureEmbedded<'a> {
    invoice: &'a FinalizedInvoice,
    xml: String,
    hash_hex: String,
    hash_base64: String,
    signing_time: String,
    signature: String,
}

impl SignatureEmbedded<'_> {
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Encode the nine-tag QR payload and write it into the QR placeholder.
    pub fn embed_qr(
        self,
        public_key: [u8; 64],
        ca_signature: &[u8],
    ) -> Result<SignedInvoiceResult> {
        let data = self.invoice.data();
        let totals = self.invoice.totals();
        let qr_base64 = generate_phase2_qr(&Phase2QrFields {
            base: Phase1QrFields {
                seller_name: data.seller().name().to_string(),
                vat_number: data
                    .seller()
                    .vat_id()
                    .map(VatId::as_str)
                    .unwrap_or_default()
                    .to_string(),
                timestamp: self.signing_time,
                total_amount: format_amount(totals.tax_inclusive_amount()),
                vat_amount: format_amount(totals.tax_amount()),
            },
            invoice_hash_hex: self.hash_hex,
            signature_base64: self.signature.clone(),
            public_key,
            ca_signature: ca_signature.to_vec(),
        })?;
        let xml = xml::embed_qr(&self.xml, &qr_base64)?;
        debug!(invoice = data.id(), qr_len = qr_base64.len(), "embedded QR code");
        Ok(SignedInvoiceResult {
            xml,
            invoice_hash: self.hash_base64,
            signature: self.signature,
            qr_base64,
        })
    }
}

/// Private key plus the certificate issued for it.
pub struct InvoiceSigner {
    private_key: Zeroizing<String>,
    public_key: [u8; 64],
    certificate: SigningCertificate,
}

impl InvoiceSigner {
    /// Load a signer from a PEM-or-hex private key and a base64/PEM certificate.
    ///
    /// When the certificate carries a public key it must belong to `private_key`.
    pub fn new(
        private_key: &str,
        certificate: &str,
        env: EnvironmentType,
        parser: &dyn CertParser,
    ) -> Result<Self> {
        let key = crypto::parse_private_key(private_key)?;
        let own_key = crypto::public_key_hex(key.verifying_key());
        let certificate = SigningCertificate::load(certificate, parser, env)?;
        if let Some(cert_key) = certificate.public_key() {
            if !cert_key.eq_ignore_ascii_case(&own_key) {
                return Err(CertificateParsingError::KeyMismatch.into());
            }
        }
        let public_key = crypto::public_key_raw_bytes(&own_key)?;
        Ok(Self {
            private_key: Zeroizing::new(hex::encode(key.to_bytes())),
            public_key,
            certificate,
        })
    }

    pub fn certificate(&self) -> &SigningCertificate {
        &self.certificate
    }

    /// Uncompressed public key as hex.
    pub fn public_key_hex(&self) -> String {
        let mut prefixed = Vec::with_capacity(65);
        prefixed.push(0x04);
        prefixed.extend_from_slice(&self.public_key);
        hex::encode(prefixed)
    }

    /// Run the full pipeline.
    pub fn sign(&self, invoice: &FinalizedInvoice) -> Result<SignedInvoiceResult> {
        let result = UnsignedInvoice::new(invoice)?
            .compute_hash()?
            .sign_properties(&self.certificate)
            .embed_signature(&self.private_key, &self.certificate)?
            .embed_qr(self.public_key, self.certificate.ca_signature())?;
        debug!(
            invoice = invoice.data().id(),
            counter = invoice.data().invoice_counter(),
            "signed invoice"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for InvoiceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvoiceSigner")
            .field("public_key", &self.public_key_hex())
            .field("certificate", &self.certificate.issuer_serial())
            .finish_non_exhaustive()
    }
}
