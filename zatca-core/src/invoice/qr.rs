//! TLV payloads for the printed QR code.
//!
//! Phase 1 carries five text fields. Phase 2 adds the invoice hash, the ECDSA signature, the raw
//! public key and the CA signature of the certificate, all as raw bytes.
use crate::der;
use base64ct::{Base64, Encoding};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrCodeError {
    #[error("seller legal name is missing")]
    MissingSellerName,
    #[error("seller VAT number is missing")]
    MissingSellerVat,
    #[error("TLV field {tag} is too long ({len} bytes)")]
    ValueTooLong { tag: u8, len: usize },
    #[error("QR field {field} is not valid {encoding}")]
    InvalidEncoding {
        field: &'static str,
        encoding: &'static str,
    },
    #[error("malformed TLV payload at byte {offset}")]
    Malformed { offset: usize },
}

pub type QrResult<T> = std::result::Result<T, QrCodeError>;

/// Largest value a QR TLV length can carry.
pub const MAX_VALUE_LEN: usize = u16::MAX as usize;

/// Text fields shared by both phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase1QrFields {
    pub seller_name: String,
    pub vat_number: String,
    /// ISO-8601, e.g. `2024-01-01T10:00:00Z`.
    pub timestamp: String,
    /// Total including VAT, two decimals.
    pub total_amount: String,
    pub vat_amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase2QrFields {
    pub base: Phase1QrFields,
    /// Hex SHA-256 of the canonical invoice.
    pub invoice_hash_hex: String,
    /// Base64 DER ECDSA signature.
    pub signature_base64: String,
    /// Raw X‖Y public key coordinates.
    pub public_key: [u8; 64],
    /// CA signature from the certificate; empty when it could not be extracted.
    pub ca_signature: Vec<u8>,
}

struct TlvBuilder {
    bytes: Vec<u8>,
}

impl TlvBuilder {
    fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(512),
        }
    }

    fn push_str(&mut self, tag: u8, value: &str) -> QrResult<()> {
        self.push_bytes(tag, value.as_bytes())
    }

    fn push_bytes(&mut self, tag: u8, value: &[u8]) -> QrResult<()> {
        if value.len() > MAX_VALUE_LEN {
            return Err(QrCodeError::ValueTooLong {
                tag,
                len: value.len(),
            });
        }
        self.bytes.push(tag);
        self.bytes.extend_from_slice(&der::encode_length(value.len()));
        self.bytes.extend_from_slice(value);
        Ok(())
    }

    fn push_text_fields(&mut self, fields: &Phase1QrFields) -> QrResult<()> {
        if fields.seller_name.trim().is_empty() {
            return Err(QrCodeError::MissingSellerName);
        }
        if fields.vat_number.trim().is_empty() {
            return Err(QrCodeError::MissingSellerVat);
        }
        self.push_str(1, &fields.seller_name)?;
        self.push_str(2, &fields.vat_number)?;
        self.push_str(3, &fields.timestamp)?;
        self.push_str(4, &fields.total_amount)?;
        self.push_str(5, &fields.vat_amount)
    }

    fn finish(self) -> String {
        Base64::encode_string(&self.bytes)
    }
}

/// Five-tag payload with every value as UTF-8 text.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::{decode_tlv, generate_phase1_qr, Phase1QrFields};
///
/// let qr = generate_phase1_qr(&Phase1QrFields {
///     seller_name: "Test Co".into(),
///     vat_number: "300000000000003".into(),
///     timestamp: "2024-01-01T10:00:00Z".into(),
///     total_amount: "115.00".into(),
///     vat_amount: "15.00".into(),
/// })?;
/// let fields = decode_tlv(&qr)?;
/// assert_eq!(fields[0], (1, b"Test Co".to_vec()));
/// # Ok::<(), zatca_core::invoice::QrCodeError>(())
/// ```
pub fn generate_phase1_qr(fields: &Phase1QrFields) -> QrResult<String> {
    let mut tlv = TlvBuilder::new();
    tlv.push_text_fields(fields)?;
    Ok(tlv.finish())
}

/// Nine-tag payload; tags 6 to 9 hold raw bytes decoded from their text forms.
pub fn generate_phase2_qr(fields: &Phase2QrFields) -> QrResult<String> {
    let hash = hex::decode(fields.invoice_hash_hex.trim()).map_err(|_| {
        QrCodeError::InvalidEncoding {
            field: "invoice hash",
            encoding: "hex",
        }
    })?;
    let signature = Base64::decode_vec(fields.signature_base64.trim()).map_err(|_| {
        QrCodeError::InvalidEncoding {
            field: "signature",
            encoding: "base64",
        }
    })?;

    let mut tlv = TlvBuilder::new();
    tlv.push_text_fields(&fields.base)?;
    tlv.push_bytes(6, &hash)?;
    tlv.push_bytes(7, &signature)?;
    tlv.push_bytes(8, &fields.public_key)?;
    tlv.push_bytes(9, &fields.ca_signature)?;
    Ok(tlv.finish())
}

/// Split a base64 TLV payload into `(tag, value)` pairs in payload order.
///
/// # Errors
/// Fails on invalid base64, a truncated field or an unsupported length form.
pub fn decode_tlv(qr_base64: &str) -> QrResult<Vec<(u8, Vec<u8>)>> {
    let bytes = Base64::decode_vec(qr_base64.trim()).map_err(|_| QrCodeError::InvalidEncoding {
        field: "payload",
        encoding: "base64",
    })?;
    let mut fields = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let malformed = QrCodeError::Malformed { offset };
        let tag = bytes[offset];
        let rest = bytes.get(offset + 1..).ok_or_else(|| malformed.clone())?;
        let (len, header) = der::decode_length(rest).map_err(|_| malformed.clone())?;
        let start = offset + 1 + header;
        let end = start.checked_add(len).ok_or_else(|| malformed.clone())?;
        let value = bytes.get(start..end).ok_or(malformed)?;
        fields.push((tag, value.to_vec()));
        offset = end;
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Phase1QrFields {
        Phase1QrFields {
            seller_name: "Test Co".into(),
            vat_number: "300000000000003".into(),
            timestamp: "2024-01-01T10:00:00Z".into(),
            total_amount: "115.00".into(),
            vat_amount: "15.00".into(),
        }
    }

    #[test]
    fn phase1_round_trips_text_fields() {
        let decoded = decode_tlv(&generate_phase1_qr(&base()).unwrap()).unwrap();
        let expected: Vec<(u8, Vec<u8>)> = vec![
            (1, b"Test Co".to_vec()),
            (2, b"300000000000003".to_vec()),
            (3, b"2024-01-01T10:00:00Z".to_vec()),
            (4, b"115.00".to_vec()),
            (5, b"15.00".to_vec()),
        ];
        assert_eq!(decoded, expected);
    }

    #[test]
    fn phase1_bytes_match_hand_encoding() {
        let qr = generate_phase1_qr(&base()).unwrap();
        let bytes = Base64::decode_vec(&qr).unwrap();
        assert_eq!(&bytes[..9], &[1, 7, b'T', b'e', b's', b't', b' ', b'C', b'o']);
        assert_eq!(bytes[9..11], [2, 15]);
    }

    #[test]
    fn phase2_decodes_binary_fields() {
        let hash = [0xAB_u8; 32];
        let ca_signature = vec![0x5A; 200];
        let qr = generate_phase2_qr(&Phase2QrFields {
            base: base(),
            invoice_hash_hex: hex::encode(hash),
            signature_base64: Base64::encode_string(&[0x30, 0x44, 0x02]),
            public_key: [7; 64],
            ca_signature: ca_signature.clone(),
        })
        .unwrap();
        let decoded = decode_tlv(&qr).unwrap();
        let tags: Vec<u8> = decoded.iter().map(|(tag, _)| *tag).collect();
        assert_eq!(tags, (1..=9).collect::<Vec<u8>>());
        assert_eq!(decoded[5].1, hash.to_vec());
        assert_eq!(decoded[6].1, vec![0x30, 0x44, 0x02]);
        assert_eq!(decoded[7].1, vec![7; 64]);
        assert_eq!(decoded[8].1, ca_signature);

        // 200-byte value uses the 0x81 long form
        let raw = Base64::decode_vec(&qr).unwrap();
        let tag9 = raw.len() - 200 - 3;
        assert_eq!(&raw[tag9..tag9 + 3], &[9, 0x81, 200]);
    }

    #[test]
    fn phase2_accepts_empty_ca_signature() {
        let qr = generate_phase2_qr(&Phase2QrFields {
            base: base(),
            invoice_hash_hex: "00".repeat(32),
            signature_base64: "AQ==".into(),
            public_key: [1; 64],
            ca_signature: Vec::new(),
        })
        .unwrap();
        let decoded = decode_tlv(&qr).unwrap();
        assert_eq!(decoded.last(), Some(&(9, Vec::new())));
    }

    #[test]
    fn rejects_missing_seller_and_bad_inputs() {
        let mut fields = base();
        fields.seller_name = "  ".into();
        assert_eq!(
            generate_phase1_qr(&fields),
            Err(QrCodeError::MissingSellerName)
        );
        let err = generate_phase2_qr(&Phase2QrFields {
            base: base(),
            invoice_hash_hex: "zz".into(),
            signature_base64: "AQ==".into(),
            public_key: [0; 64],
            ca_signature: Vec::new(),
        })
        .unwrap_err();
        assert!(matches!(err, QrCodeError::InvalidEncoding { field: "invoice hash", .. }));
    }

    #[test]
    fn oversized_values_are_rejected() {
        let mut tlv = TlvBuilder::new();
        assert_eq!(
            tlv.push_bytes(6, &vec![0; MAX_VALUE_LEN + 1]),
            Err(QrCodeError::ValueTooLong {
                tag: 6,
                len: MAX_VALUE_LEN + 1
            })
        );
    }

    #[test]
    fn text_fields_are_encoded_untrimmed() {
        let mut fields = base();
        fields.seller_name = " Test Co ".into();
        fields.vat_number = "300000000000003 ".into();
        let decoded = decode_tlv(&generate_phase1_qr(&fields).unwrap()).unwrap();
        assert_eq!(decoded[0], (1, b" Test Co ".to_vec()));
        assert_eq!(decoded[1], (2, b"300000000000003 ".to_vec()));
    }

    #[test]
    fn oversized_length_is_malformed() {
        let payload = Base64::encode_string(&[1, 0x88, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(decode_tlv(&payload), Err(QrCodeError::Malformed { offset: 0 }));

        let dangling_tag = Base64::encode_string(&[1, 1, b'a', 2]);
        assert_eq!(
            decode_tlv(&dangling_tag),
            Err(QrCodeError::Malformed { offset: 3 })
        );
    }

    #[test]
    fn truncated_payload_is_malformed() {
        let payload = Base64::encode_string(&[1, 5, b'a', b'b']);
        assert_eq!(decode_tlv(&payload), Err(QrCodeError::Malformed { offset: 0 }));
    }
}
