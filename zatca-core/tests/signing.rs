mod common;

use base64ct::{Base64, Encoding};
use common::{
    between, build_test_cert, simplified_invoice, standard_credit_note, test_cert_base64, test_key,
    TEST_PRIVATE_KEY,
};
use zatca_core::certificate::{
    extract_certificate_signature, extract_public_key_from_certificate, DerCertParser,
};
use zatca_core::config::EnvironmentType;
use zatca_core::credentials::{CredentialStatus, Credentials};
use zatca_core::crypto::{self, KeyProvider};
use zatca_core::crypto::native::NativeKeyProvider;
use zatca_core::invoice::canonical::invoice_hash_input;
use zatca_core::invoice::sign::{InvoiceSigner, SigningError};
use zatca_core::invoice::{decode_tlv, GENESIS_PREVIOUS_INVOICE_HASH};

fn signer_for(certificate: &str, env: EnvironmentType) -> InvoiceSigner {
    InvoiceSigner::new(TEST_PRIVATE_KEY, certificate, env, &DerCertParser).expect("signer")
}

fn signer(env: EnvironmentType) -> InvoiceSigner {
    signer_for(&test_cert_base64(&test_key()), env)
}

#[test]
fn sign_invoice_emits_signature_and_qr() {
    let cert = test_cert_base64(&test_key());
    let signed = simplified_invoice(1, GENESIS_PREVIOUS_INVOICE_HASH)
        .sign(&signer_for(&cert, EnvironmentType::Production))
        .expect("sign");
    let xml = signed.xml();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Invoice "));
    assert!(xml.contains(&format!("<ds:X509Certificate>{cert}</ds:X509Certificate>")));
    assert!(xml.contains("<ds:X509SerialNumber xmlns:ds=\"http://www.w3.org/2000/09/xmldsig#\">1</ds:X509SerialNumber>"));
    assert!(xml.contains("<xades:SigningTime>2022-09-07T12:21:28Z</xades:SigningTime>"));
    assert!(!signed.qr_base64().is_empty());
    assert!(!xml.contains("ZATCA:"), "placeholders must be replaced");

    let public_key = extract_public_key_from_certificate(&cert).expect("certificate key");
    let signed_info = between(xml, "<ds:SignedInfo", "</ds:SignedInfo>");
    assert!(crypto::verify_hash(
        &public_key,
        &crypto::sha256_hash(signed_info),
        signed.signature()
    ));
}

#[test]
fn invoice_hash_survives_signing() {
    let invoice = simplified_invoice(1, GENESIS_PREVIOUS_INVOICE_HASH);
    let unsigned = invoice.to_unsigned_xml().expect("unsigned");
    let signed = invoice
        .sign(&signer(EnvironmentType::Sandbox))
        .expect("sign");

    let unsigned_hash = crypto::sha256_hash_base64(invoice_hash_input(&unsigned).expect("c14n"));
    let signed_hash =
        crypto::sha256_hash_base64(invoice_hash_input(signed.xml()).expect("c14n signed"));
    assert_eq!(unsigned_hash, signed.invoice_hash());
    assert_eq!(signed_hash, signed.invoice_hash());
}

#[test]
fn qr_payload_matches_document() {
    let cert = test_cert_base64(&test_key());
    let signed = simplified_invoice(1, GENESIS_PREVIOUS_INVOICE_HASH)
        .sign(&signer_for(&cert, EnvironmentType::Production))
        .expect("sign");
    let fields = decode_tlv(signed.qr_base64()).expect("tlv");

    let tags: Vec<u8> = fields.iter().map(|(tag, _)| *tag).collect();
    assert_eq!(tags, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(fields[0].1, b"Maximum Speed Tech Supply LTD".to_vec());
    assert_eq!(fields[1].1, b"399999999900003".to_vec());
    assert_eq!(fields[2].1, b"2022-09-07T12:21:28Z".to_vec());
    // 2 x 2.00 + 3 x 32.00 = 100.00 net, 15.00 VAT
    assert_eq!(fields[3].1, b"115.00".to_vec());
    assert_eq!(fields[4].1, b"15.00".to_vec());
    assert_eq!(
        fields[5].1,
        Base64::decode_vec(signed.invoice_hash()).expect("hash")
    );
    assert_eq!(
        fields[6].1,
        Base64::decode_vec(signed.signature()).expect("signature")
    );
    let public_key = extract_public_key_from_certificate(&cert).expect("key");
    assert_eq!(
        fields[7].1,
        crypto::public_key_raw_bytes(&public_key).expect("raw").to_vec()
    );
    assert_eq!(fields[8].1, extract_certificate_signature(&cert));
    assert!(!fields[8].1.is_empty());
}

#[test]
fn previous_invoice_hash_chains_invoices() {
    let signer = signer(EnvironmentType::Sandbox);
    let mut previous = GENESIS_PREVIOUS_INVOICE_HASH.to_string();
    for counter in 1..=3 {
        let signed = simplified_invoice(counter, &previous)
            .sign(&signer)
            .expect("sign");
        let pih = between(
            signed.xml(),
            "<cbc:ID>PIH</cbc:ID>",
            "</cac:AdditionalDocumentReference>",
        );
        assert!(
            pih.contains(&format!(">{previous}</cbc:EmbeddedDocumentBinaryObject>")),
            "invoice {counter} must embed the previous hash"
        );
        assert!(signed
            .xml()
            .contains(&format!("<cbc:UUID>{counter}</cbc:UUID>")));
        previous = signed.invoice_hash().to_string();
    }
}

#[test]
fn credit_note_signs_under_its_own_root() {
    let signed = standard_credit_note(2, GENESIS_PREVIOUS_INVOICE_HASH)
        .sign(&signer(EnvironmentType::Sandbox))
        .expect("sign");
    let xml = signed.xml();
    assert!(xml.contains(
        "<CreditNote xmlns=\"urn:oasis:names:specification:ubl:schema:xsd:CreditNote-2\""
    ));
    assert!(xml.contains("<cbc:CreditNoteTypeCode name=\"0100000\">381</cbc:CreditNoteTypeCode>"));
    assert!(xml.contains("<cbc:ID>SME00010</cbc:ID>"));
    assert!(xml.contains("<cbc:CreditedQuantity unitCode=\"PCE\">"));

    let hash = crypto::sha256_hash_base64(invoice_hash_input(xml).expect("c14n"));
    assert_eq!(hash, signed.invoice_hash());
}

#[test]
fn generated_key_signs_with_freshly_issued_certificate() {
    let pair = NativeKeyProvider.generate_key_pair().expect("pair");
    let key = pair.signing_key().expect("key");
    let cert = Base64::encode_string(&build_test_cert(&key));
    let signer = InvoiceSigner::new(
        pair.private_key_pem(),
        &cert,
        EnvironmentType::Simulation,
        &DerCertParser,
    )
    .expect("signer");
    assert_eq!(signer.public_key_hex(), pair.public_key());

    let signed = simplified_invoice(1, GENESIS_PREVIOUS_INVOICE_HASH)
        .sign(&signer)
        .expect("sign");
    let signed_info = between(signed.xml(), "<ds:SignedInfo", "</ds:SignedInfo>");
    assert!(crypto::verify_hash(
        pair.public_key(),
        &crypto::sha256_hash(signed_info),
        signed.signature()
    ));
}

#[test]
fn signer_comes_from_stored_credentials() {
    let key = test_key();
    let mut credentials = Credentials::new(
        TEST_PRIVATE_KEY.into(),
        crypto::public_key_hex(key.verifying_key()),
        EnvironmentType::Simulation,
    );
    credentials.advance_to(CredentialStatus::Compliance).expect("compliance");
    credentials.ccsid = Some(test_cert_base64(&key));

    let signer = InvoiceSigner::new(
        &credentials.private_key,
        credentials.signing_certificate().expect("certificate"),
        credentials.environment,
        &DerCertParser,
    )
    .expect("signer");
    assert_eq!(signer.public_key_hex(), credentials.public_key);
}

#[test]
fn mismatched_certificate_is_rejected() {
    let other = k256::ecdsa::SigningKey::from_slice(&[0x42; 32]).expect("key");
    let err = InvoiceSigner::new(
        TEST_PRIVATE_KEY,
        &test_cert_base64(&other),
        EnvironmentType::Sandbox,
        &DerCertParser,
    )
    .expect_err("mismatch");
    assert!(matches!(err, SigningError::Certificate(_)));
}

#[test]
fn production_refuses_unparsable_certificate() {
    let err = InvoiceSigner::new(
        TEST_PRIVATE_KEY,
        "bm90IGEgY2VydGlmaWNhdGU=",
        EnvironmentType::Production,
        &DerCertParser,
    )
    .expect_err("garbage certificate");
    assert!(matches!(err, SigningError::Certificate(_)));
}
