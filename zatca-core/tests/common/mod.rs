use base64ct::{Base64, Encoding};
use chrono::TimeZone;
use iso_currency::Currency;
use isocountry::CountryCode;
use k256::ecdsa::SigningKey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use x509_cert::builder::{Builder, CertificateBuilder, Profile};
use x509_cert::der::Encode;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Validity;
use zatca_core::config::EnvironmentType;
use zatca_core::csr::CsrConfig;
use zatca_core::invoice::{
    Address, Buyer, FinalizedInvoice, InvoiceBuilder, InvoiceSubType, InvoiceType, LineItem,
    LineItemFields, OtherId, OriginalInvoiceRef, RequiredInvoiceFields, Seller, VatCategory,
};

pub const TEST_PRIVATE_KEY: &str =
    "c9d1b4a8e0f2a3b7d6e5c4f3a2b1908f7e6d5c4b3a29180f7e6d5c4b3a291807";

#[allow(dead_code)]
pub fn fixture_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(relative)
}

#[allow(dead_code)]
pub fn test_key() -> SigningKey {
    SigningKey::from_slice(&hex::decode(TEST_PRIVATE_KEY).expect("hex")).expect("key")
}

/// Self-signed certificate for `key`, serial 1.
#[allow(dead_code)]
pub fn build_test_cert(key: &SigningKey) -> Vec<u8> {
    let serial_number = SerialNumber::from(1u32);
    let validity = Validity::from_now(Duration::new(3600, 0)).expect("validity");
    let subject = Name::from_str("CN=Test CA,O=Zatca Test,C=SA").expect("subject");
    let public_key = SubjectPublicKeyInfoOwned::from_key(*key.verifying_key()).expect("spki");
    let builder = CertificateBuilder::new(
        Profile::Root,
        serial_number,
        validity,
        subject,
        public_key,
        key,
    )
    .expect("builder");
    let cert = builder
        .build::<k256::ecdsa::DerSignature>()
        .expect("certificate");
    cert.to_der().expect("cert der")
}

#[allow(dead_code)]
pub fn test_cert_base64(key: &SigningKey) -> String {
    Base64::encode_string(&build_test_cert(key))
}

#[allow(dead_code)]
pub fn seller() -> Seller {
    Seller::new(
        "Maximum Speed Tech Supply LTD".into(),
        Address {
            country_code: CountryCode::SAU,
            city: "Riyadh".into(),
            street: "Prince Sultan".into(),
            additional_street: None,
            building_number: "2322".into(),
            additional_number: None,
            postal_code: "23333".into(),
            subdivision: Some("Riyadh".into()),
            district: Some("Al-Murabba".into()),
        },
        "399999999900003",
        Some(OtherId::with_scheme("1010010000", "CRN")),
    )
    .expect("valid seller")
}

#[allow(dead_code)]
pub fn buyer() -> Buyer {
    Buyer::new(
        "Fatoora Samples LTD".into(),
        Address {
            country_code: CountryCode::SAU,
            city: "Riyadh".into(),
            street: "Salah Al-Din".into(),
            additional_street: None,
            building_number: "1111".into(),
            additional_number: None,
            postal_code: "12222".into(),
            subdivision: None,
            district: Some("Al-Murooj".into()),
        },
        Some("399999999800003".into()),
        None,
    )
    .expect("valid buyer")
}

#[allow(dead_code)]
pub fn line_items() -> Vec<LineItem> {
    vec![
        LineItem::new(LineItemFields {
            description: "Pencil".into(),
            quantity: 2.0,
            unit_code: "PCE".into(),
            unit_price: 2.0,
            vat_rate: 15.0,
            vat_category: VatCategory::Standard,
        }),
        LineItem::new(LineItemFields {
            description: "Notebook".into(),
            quantity: 3.0,
            unit_code: "PCE".into(),
            unit_price: 32.0,
            vat_rate: 15.0,
            vat_category: VatCategory::Standard,
        }),
    ]
}

#[allow(dead_code)]
pub fn required_fields(counter: u64, previous_invoice_hash: &str) -> RequiredInvoiceFields {
    RequiredInvoiceFields {
        invoice_type: InvoiceType::Tax(InvoiceSubType::Simplified),
        id: format!("SME{counter:05}"),
        uuid: "8d487816-70b8-4ade-a618-9d620b73814a".into(),
        issue_datetime: chrono::Utc
            .with_ymd_and_hms(2022, 9, 7, 12, 21, 28)
            .single()
            .expect("datetime"),
        currency: Currency::SAR,
        previous_invoice_hash: previous_invoice_hash.into(),
        invoice_counter: counter,
        seller: seller(),
        line_items: line_items(),
        payment_means_code: "10".into(),
    }
}

#[allow(dead_code)]
pub fn simplified_invoice(counter: u64, previous_invoice_hash: &str) -> FinalizedInvoice {
    InvoiceBuilder::new(required_fields(counter, previous_invoice_hash))
        .build()
        .expect("build invoice")
}

#[allow(dead_code)]
pub fn standard_credit_note(counter: u64, previous_invoice_hash: &str) -> FinalizedInvoice {
    let mut fields = required_fields(counter, previous_invoice_hash);
    fields.invoice_type = InvoiceType::CreditNote(
        InvoiceSubType::Standard,
        OriginalInvoiceRef::new("SME00010"),
        "CANCELLATION_OR_TERMINATION".into(),
    );
    InvoiceBuilder::new(fields)
        .buyer(buyer())
        .build()
        .expect("build credit note")
}

#[allow(dead_code)]
pub fn csr_config(environment: EnvironmentType) -> CsrConfig {
    CsrConfig {
        common_name: "TST-886431145-399999999900003".into(),
        serial_number: "1-TST|2-TST|3-ed22f1d8-e6a2-1118-9b58-d9a8f11e445f".into(),
        organization_identifier: "399999999900003".into(),
        organization_name: "Maximum Speed Tech Supply LTD".into(),
        organization_unit: Some("Riyadh Branch".into()),
        country_name: "SA".into(),
        invoice_type: "1100".into(),
        location: "RRRD2929".into(),
        industry: "Supply activities".into(),
        environment,
        email_address: None,
    }
}

/// `true` when an `openssl` binary can be spawned.
#[allow(dead_code)]
pub fn openssl_available() -> bool {
    std::process::Command::new("openssl")
        .arg("version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Slice of `xml` from the first `start` through the following `end`, inclusive.
#[allow(dead_code)]
pub fn between<'a>(xml: &'a str, start: &str, end: &str) -> &'a str {
    let from = xml.find(start).expect("start marker");
    let to = xml[from..].find(end).expect("end marker") + from + end.len();
    &xml[from..to]
}
