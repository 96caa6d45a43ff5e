//! CSR configuration and helpers.
use crate::config::EnvironmentType;
use base64ct::{Base64, Encoding};
use java_properties::read;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use x509_cert::{
    der::{asn1::PrintableStringRef, Encode, Length, Result as DerResult, Writer},
    ext::{
        pkix::{name::GeneralName, SubjectAltName},
        AsExtension, Extension,
    },
    name::Name,
};

/// OID of the Microsoft certificate template name extension ZATCA requires in every CSR.
pub const TEMPLATE_NAME_OID: &str = "1.3.6.1.4.1.311.20.2";

/// Errors raised while loading or validating a [`CsrConfig`].
#[derive(Debug, Error)]
pub enum CsrConfigError {
    #[error("failed to open CSR config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse CSR properties from '{path}': {source}")]
    PropertiesRead {
        path: PathBuf,
        #[source]
        source: java_properties::PropertiesError,
    },

    #[error("missing required CSR property '{key}' in file '{path}'")]
    MissingProperty { path: PathBuf, key: String },

    #[error("{field} must be non-empty")]
    Empty { field: &'static str },

    #[error("{field} contains a character not allowed in a distinguished name: {value:?}")]
    ForbiddenCharacter { field: &'static str, value: String },

    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("invalid subject distinguished name: {message}")]
    InvalidSubject { message: String },

    #[error("invalid Subject Alternative Name (SAN): {message}")]
    InvalidSan { message: String },
}

/// Immutable input for one certificate signing request.
///
/// `environment` selects the certificate template name carried by the `1.3.6.1.4.1.311.20.2`
/// extension. The five SAN fields use ZATCA's short names: `serial_number` → `SN`,
/// `organization_identifier` → `UID`, `invoice_type` → `title`, `location` →
/// `registeredAddress`, `industry` → `businessCategory`.
///
/// # Examples
/// ```rust
/// use zatca_core::config::EnvironmentType;
/// use zatca_core::csr::CsrConfig;
///
/// let config = CsrConfig {
///     common_name: "TST-886431145-399999999900003".into(),
///     serial_number: "1-TST|2-TST|3-ed22f1d8-e6a2-1118-9b58-d9a8f11e445f".into(),
///     organization_identifier: "399999999900003".into(),
///     organization_name: "Maximum Speed Tech Supply LTD".into(),
///     organization_unit: Some("Riyadh Branch".into()),
///     country_name: "SA".into(),
///     invoice_type: "1100".into(),
///     location: "RRRD2929".into(),
///     industry: "Supply activities".into(),
///     environment: EnvironmentType::Sandbox,
///     email_address: None,
/// };
/// config.validate()?;
/// assert!(config.openssl_config().contains("TSTZATCA-Code-Signing"));
/// # Ok::<(), zatca_core::csr::CsrConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrConfig {
    pub common_name: String,
    pub serial_number: String,
    pub organization_identifier: String,
    pub organization_name: String,
    pub organization_unit: Option<String>,
    pub country_name: String,
    pub invoice_type: String,
    pub location: String,
    pub industry: String,
    pub environment: EnvironmentType,
    pub email_address: Option<String>,
}

fn check_value(field: &'static str, value: &str) -> Result<(), CsrConfigError> {
    if value.trim().is_empty() {
        return Err(CsrConfigError::Empty { field });
    }
    if value
        .chars()
        .any(|c| c.is_control() || matches!(c, '=' | ',' | '+' | '"' | '\\' | '<' | '>' | ';'))
    {
        return Err(CsrConfigError::ForbiddenCharacter {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl CsrConfig {
    /// Check every field against ZATCA's CSR rules.
    ///
    /// # Errors
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), CsrConfigError> {
        check_value("common_name", &self.common_name)?;
        check_value("serial_number", &self.serial_number)?;
        check_value("organization_identifier", &self.organization_identifier)?;
        check_value("organization_name", &self.organization_name)?;
        check_value("country_name", &self.country_name)?;
        check_value("invoice_type", &self.invoice_type)?;
        check_value("location", &self.location)?;
        check_value("industry", &self.industry)?;
        if let Some(unit) = &self.organization_unit {
            check_value("organization_unit", unit)?;
        }
        if let Some(email) = &self.email_address {
            check_value("email_address", email)?;
            if !email.contains('@') {
                return Err(CsrConfigError::Invalid {
                    field: "email_address",
                    message: format!("'{email}' is not an email address"),
                });
            }
        }

        if self.country_name.len() != 2
            || isocountry::CountryCode::for_alpha2(&self.country_name.to_ascii_uppercase()).is_err()
        {
            return Err(CsrConfigError::Invalid {
                field: "country_name",
                message: format!("'{}' is not an ISO 3166 alpha-2 code", self.country_name),
            });
        }

        if self.invoice_type.len() != 4 || !self.invoice_type.chars().all(|c| c == '0' || c == '1')
        {
            return Err(CsrConfigError::Invalid {
                field: "invoice_type",
                message: "expected four 0/1 flags (standard, simplified, future use, future use)"
                    .into(),
            });
        }

        let vat = &self.organization_identifier;
        if vat.len() != 15
            || !vat.chars().all(|c| c.is_ascii_digit())
            || !vat.starts_with('3')
            || !vat.ends_with('3')
        {
            return Err(CsrConfigError::Invalid {
                field: "organization_identifier",
                message: format!("'{vat}' is not a 15-digit VAT number starting and ending with 3"),
            });
        }
        Ok(())
    }

    /// Load the ZATCA SDK `csr.*` properties format.
    ///
    /// `csr.organization.unit.name` and `csr.email.address` are optional; the environment is
    /// supplied by the caller rather than read from the file.
    ///
    /// # Errors
    /// Returns [`CsrConfigError`] for I/O, missing keys, or validation failures.
    pub fn from_properties_file(
        path: &Path,
        environment: EnvironmentType,
    ) -> Result<Self, CsrConfigError> {
        let pathbuf = path.to_path_buf();
        let file = File::open(path).map_err(|e| CsrConfigError::Io {
            path: pathbuf.clone(),
            source: e,
        })?;
        let map = read(BufReader::new(file)).map_err(|e| CsrConfigError::PropertiesRead {
            path: pathbuf.clone(),
            source: e,
        })?;

        let req = |key: &str| -> Result<String, CsrConfigError> {
            map.get(key)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| CsrConfigError::MissingProperty {
                    path: pathbuf.clone(),
                    key: key.to_string(),
                })
        };
        let opt = |key: &str| {
            map.get(key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let config = CsrConfig {
            common_name: req("csr.common.name")?,
            serial_number: req("csr.serial.number")?,
            organization_identifier: req("csr.organization.identifier")?,
            organization_name: req("csr.organization.name")?,
            organization_unit: opt("csr.organization.unit.name"),
            country_name: req("csr.country.name")?,
            invoice_type: req("csr.invoice.type")?,
            location: req("csr.location.address")?,
            industry: req("csr.industry.business.category")?,
            environment,
            email_address: opt("csr.email.address"),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn template_name(&self) -> &'static str {
        self.environment.template_name()
    }

    /// Render the `openssl req -config` file for this request.
    pub fn openssl_config(&self) -> String {
        let mut dn = format!("C = {}\n", self.country_name.to_ascii_uppercase());
        if let Some(unit) = &self.organization_unit {
            dn.push_str(&format!("OU = {unit}\n"));
        }
        dn.push_str(&format!("O = {}\n", self.organization_name));
        dn.push_str(&format!("CN = {}\n", self.common_name));
        if let Some(email) = &self.email_address {
            dn.push_str(&format!("emailAddress = {email}\n"));
        }

        format!(
            "oid_section = zatca_oids\n\
             \n\
             [ zatca_oids ]\n\
             certificateTemplateName = {oid}\n\
             \n\
             [ req ]\n\
             default_md = sha256\n\
             prompt = no\n\
             utf8 = yes\n\
             string_mask = utf8only\n\
             distinguished_name = req_dn\n\
             req_extensions = v3_req\n\
             \n\
             [ req_dn ]\n\
             {dn}\
             \n\
             [ v3_req ]\n\
             certificateTemplateName = ASN1:PRINTABLESTRING:{template}\n\
             subjectAltName = dirName:alt_names\n\
             \n\
             [ alt_names ]\n\
             SN = {sn}\n\
             UID = {uid}\n\
             title = {title}\n\
             registeredAddress = {address}\n\
             businessCategory = {category}\n",
            oid = TEMPLATE_NAME_OID,
            template = self.template_name(),
            sn = self.serial_number,
            uid = self.organization_identifier,
            title = self.invoice_type,
            address = self.location,
            category = self.industry,
        )
    }

    /// Subject DN in the order ZATCA's tooling emits it.
    pub fn subject(&self) -> Result<Name, CsrConfigError> {
        let mut parts = vec![format!("C={}", self.country_name.to_ascii_uppercase())];
        if let Some(unit) = &self.organization_unit {
            parts.push(format!("OU={unit}"));
        }
        parts.push(format!("O={}", self.organization_name));
        parts.push(format!("CN={}", self.common_name));
        Name::from_str(&parts.join(",")).map_err(|e| CsrConfigError::InvalidSubject {
            message: e.to_string(),
        })
    }

    /// `subjectAltName` carrying the `dirName` with the five ZATCA attributes.
    pub fn san_extension(&self) -> Result<SubjectAltName, CsrConfigError> {
        let name = Name::from_str(&format!(
            "sn={},uid={},title={},registeredAddress={},businessCategory={}",
            self.serial_number,
            self.organization_identifier,
            self.invoice_type,
            self.location,
            self.industry
        ))
        .map_err(|e| CsrConfigError::InvalidSan {
            message: e.to_string(),
        })?;
        Ok(SubjectAltName::from(vec![GeneralName::DirectoryName(name)]))
    }

    pub fn template_extension(&self) -> TemplateNameExtension {
        TemplateNameExtension(self.template_name())
    }
}

/// The `1.3.6.1.4.1.311.20.2` extension value: a PrintableString template name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateNameExtension(pub &'static str);

impl const_oid::AssociatedOid for TemplateNameExtension {
    const OID: const_oid::ObjectIdentifier =
        const_oid::ObjectIdentifier::new_unwrap(TEMPLATE_NAME_OID);
}

impl Encode for TemplateNameExtension {
    fn encoded_len(&self) -> DerResult<Length> {
        PrintableStringRef::new(self.0)?.encoded_len()
    }

    fn encode(&self, encoder: &mut impl Writer) -> DerResult<()> {
        PrintableStringRef::new(self.0)?.encode(encoder)
    }
}

impl AsExtension for TemplateNameExtension {
    fn critical(&self, _subject: &Name, _extensions: &[Extension]) -> bool {
        false
    }
}

/// Base64 of the whole PEM text, headers included, as the compliance CSID API expects.
///
/// # Examples
/// ```rust
/// use zatca_core::csr::csr_base64;
///
/// let pem = "-----BEGIN CERTIFICATE REQUEST-----\nAA==\n-----END CERTIFICATE REQUEST-----\n";
/// assert!(csr_base64(pem).starts_with("LS0tLS1CRUdJTi"));
/// ```
pub fn csr_base64(csr_pem: &str) -> String {
    Base64::encode_string(csr_pem.as_bytes())
}
