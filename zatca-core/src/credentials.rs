//! Onboarding credentials and their status lifecycle.
use crate::config::EnvironmentType;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("cannot move credentials from {from} to {to}")]
    InvalidTransition {
        from: CredentialStatus,
        to: CredentialStatus,
    },
    #[error("no certificate is available for signing")]
    MissingCertificate,
}

/// Linear onboarding lifecycle: `pending → compliance → production → active`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CredentialStatus {
    /// Key and CSR exist; no CSID yet.
    #[default]
    Pending,
    /// Compliance CSID issued.
    Compliance,
    /// Production CSID issued.
    Production,
    Active,
}

impl CredentialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Pending => "pending",
            CredentialStatus::Compliance => "compliance",
            CredentialStatus::Production => "production",
            CredentialStatus::Active => "active",
        }
    }

    pub fn next(&self) -> Option<CredentialStatus> {
        match self {
            CredentialStatus::Pending => Some(CredentialStatus::Compliance),
            CredentialStatus::Compliance => Some(CredentialStatus::Production),
            CredentialStatus::Production => Some(CredentialStatus::Active),
            CredentialStatus::Active => None,
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A company's ZATCA credentials as persisted by the credential store.
///
/// Secrets are wiped on drop and hidden from `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    pub private_key: String,
    pub public_key: String,
    pub csr_content: Option<String>,
    pub ccsid: Option<String>,
    pub ccsid_secret: Option<String>,
    pub pcsid: Option<String>,
    pub pcsid_secret: Option<String>,
    pub certificate: Option<String>,
    #[zeroize(skip)]
    pub environment: EnvironmentType,
    #[zeroize(skip)]
    pub status: CredentialStatus,
}

impl Credentials {
    pub fn new(private_key: String, public_key: String, environment: EnvironmentType) -> Self {
        Self {
            private_key,
            public_key,
            csr_content: None,
            ccsid: None,
            ccsid_secret: None,
            pcsid: None,
            pcsid_secret: None,
            certificate: None,
            environment,
            status: CredentialStatus::Pending,
        }
    }

    /// Move to `next`, which must be the immediate successor of the current status.
    pub fn advance_to(&mut self, next: CredentialStatus) -> Result<(), CredentialError> {
        if self.status.next() != Some(next) {
            return Err(CredentialError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        tracing::debug!(from = %self.status, to = %next, "credential status advanced");
        self.status = next;
        Ok(())
    }

    /// Certificate to sign with: production CSID, then compliance CSID, then `certificate`.
    pub fn signing_certificate(&self) -> Result<&str, CredentialError> {
        [&self.pcsid, &self.ccsid, &self.certificate]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|cert| !cert.trim().is_empty())
            .ok_or(CredentialError::MissingCertificate)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("csr_content", &self.csr_content.is_some())
            .field("ccsid", &self.ccsid.is_some())
            .field("ccsid_secret", &redact(&self.ccsid_secret))
            .field("pcsid", &self.pcsid.is_some())
            .field("pcsid_secret", &redact(&self.pcsid_secret))
            .field("certificate", &self.certificate.is_some())
            .field("environment", &self.environment)
            .field("status", &self.status)
            .finish()
    }
}
