mod common;

use base64ct::{Base64, Encoding};
use zatca_core::crypto;
use zatca_core::invoice::{
    decode_tlv, generate_phase1_qr, generate_phase2_qr, Phase1QrFields, Phase2QrFields,
};

fn phase1() -> Phase1QrFields {
    Phase1QrFields {
        seller_name: "Test Co".into(),
        vat_number: "300000000000003".into(),
        timestamp: "2024-01-01T10:00:00Z".into(),
        total_amount: "115.00".into(),
        vat_amount: "15.00".into(),
    }
}

#[test]
fn phase1_payload_decodes_to_the_five_inputs() {
    let qr = generate_phase1_qr(&phase1()).expect("qr");
    let fields = decode_tlv(&qr).expect("tlv");
    let values: Vec<(u8, String)> = fields
        .into_iter()
        .map(|(tag, value)| (tag, String::from_utf8(value).expect("utf-8")))
        .collect();
    assert_eq!(
        values,
        vec![
            (1, "Test Co".to_string()),
            (2, "300000000000003".to_string()),
            (3, "2024-01-01T10:00:00Z".to_string()),
            (4, "115.00".to_string()),
            (5, "15.00".to_string()),
        ]
    );
}

#[test]
fn phase1_handles_multibyte_seller_names() {
    let mut fields = phase1();
    fields.seller_name = "شركة الاختبار".into();
    let qr = generate_phase1_qr(&fields).expect("qr");
    let raw = Base64::decode_vec(&qr).expect("base64");
    // length counts UTF-8 bytes, not characters
    assert_eq!(raw[1] as usize, "شركة الاختبار".len());
    assert_eq!(decode_tlv(&qr).expect("tlv")[0].1, "شركة الاختبار".as_bytes());
}

#[test]
fn phase2_payload_carries_raw_signature_material() {
    let key = common::test_key();
    let public_key = crypto::public_key_hex(key.verifying_key());
    let hash_hex = crypto::sha256_hash("canonical invoice");
    let signature = crypto::sign_hash(common::TEST_PRIVATE_KEY, &hash_hex).expect("sign");
    let ca_signature = vec![0x30; 71];

    let qr = generate_phase2_qr(&Phase2QrFields {
        base: phase1(),
        invoice_hash_hex: hash_hex.clone(),
        signature_base64: signature.clone(),
        public_key: crypto::public_key_raw_bytes(&public_key).expect("raw"),
        ca_signature: ca_signature.clone(),
    })
    .expect("qr");
    let fields = decode_tlv(&qr).expect("tlv");

    assert_eq!(fields.len(), 9);
    assert_eq!(fields[5], (6, hex::decode(&hash_hex).expect("hex")));
    assert_eq!(fields[6], (7, Base64::decode_vec(&signature).expect("b64")));
    assert_eq!(fields[7].0, 8);
    assert_eq!(fields[7].1.len(), 64);
    assert_eq!(fields[7].1, hex::decode(&public_key).expect("hex")[1..].to_vec());
    assert_eq!(fields[8], (9, ca_signature));
    assert!(crypto::verify_hash(&public_key, &hash_hex, &signature));
}
