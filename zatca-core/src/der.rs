//! Minimal DER toolkit: length encoding, a tag/length/value cursor, and the few structures the
//! signing pipeline has to build by hand.
//!
//! This is deliberately not an ASN.1 parser. Certificates are decoded properly with `x509-cert`
//! where possible; this module only backs the byte-level scans that ZATCA tooling expects to
//! work on arbitrary (sometimes malformed) certificate blobs.
use thiserror::Error;

/// Errors raised while reading or building DER.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerError {
    #[error("unexpected end of DER input at offset {offset}")]
    Truncated { offset: usize },
    #[error("unsupported DER length byte 0x{first:02x} at offset {offset}")]
    UnsupportedLength { first: u8, offset: usize },
    #[error("expected DER tag 0x{expected:02x}, found 0x{found:02x} at offset {offset}")]
    UnexpectedTag {
        expected: u8,
        found: u8,
        offset: usize,
    },
    #[error("{field} must be {expected} bytes, got {actual}")]
    InvalidSize {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Universal and context-specific tags used by this crate.
pub mod tag {
    pub const INTEGER: u8 = 0x02;
    pub const BIT_STRING: u8 = 0x03;
    pub const OCTET_STRING: u8 = 0x04;
    pub const OBJECT_IDENTIFIER: u8 = 0x06;
    pub const SEQUENCE: u8 = 0x30;
    pub const CONTEXT_0: u8 = 0xA0;
    pub const CONTEXT_1: u8 = 0xA1;
}

/// DER content bytes of the secp256k1 curve OID (1.3.132.0.10).
pub const SECP256K1_OID: [u8; 5] = [0x2B, 0x81, 0x04, 0x00, 0x0A];

/// Encode a DER length.
///
/// Short form below 128, `0x81 nn` up to 255, `0x82 nn nn` up to 65535, and the general long
/// form beyond that.
///
/// # Examples
/// ```rust
/// use zatca_core::der::encode_length;
///
/// assert_eq!(encode_length(127), vec![127]);
/// assert_eq!(encode_length(128), vec![0x81, 128]);
/// assert_eq!(encode_length(256), vec![0x82, 0x01, 0x00]);
/// ```
pub fn encode_length(len: usize) -> Vec<u8> {
    if len < 0x80 {
        vec![len as u8]
    } else if len <= 0xFF {
        vec![0x81, len as u8]
    } else if len <= 0xFFFF {
        vec![0x82, (len >> 8) as u8, len as u8]
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        let mut out = Vec::with_capacity(1 + bytes.len() - skip);
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
        out
    }
}

/// Decode a DER length at the start of `input`, returning `(length, bytes_consumed)`.
///
/// # Errors
/// Fails on truncated input, the indefinite form (`0x80`), or lengths wider than `usize`.
pub fn decode_length(input: &[u8]) -> Result<(usize, usize), DerError> {
    let first = *input.first().ok_or(DerError::Truncated { offset: 0 })?;
    if first < 0x80 {
        return Ok((usize::from(first), 1));
    }
    let count = usize::from(first & 0x7F);
    if count == 0 || count > std::mem::size_of::<usize>() {
        return Err(DerError::UnsupportedLength { first, offset: 0 });
    }
    let bytes = input
        .get(1..=count)
        .ok_or(DerError::Truncated { offset: input.len() })?;
    let len = bytes
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));
    Ok((len, 1 + count))
}

/// Encode a complete tag-length-value triple.
pub fn encode_tlv(tag: u8, value: &[u8]) -> Vec<u8> {
    let len = encode_length(value.len());
    let mut out = Vec::with_capacity(1 + len.len() + value.len());
    out.push(tag);
    out.extend_from_slice(&len);
    out.extend_from_slice(value);
    out
}

/// One decoded element. `offset` is the absolute position of the tag byte in the outermost
/// buffer the reader was created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub offset: usize,
    pub header_len: usize,
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    pub fn is_constructed(&self) -> bool {
        self.tag & 0x20 != 0
    }

    /// Total encoded size including tag and length bytes.
    pub fn encoded_len(&self) -> usize {
        self.header_len + self.value.len()
    }

    /// Reader over the element's content, keeping absolute offsets.
    pub fn children(&self) -> DerReader<'a> {
        DerReader {
            input: self.value,
            pos: 0,
            base: self.offset + self.header_len,
        }
    }

    /// Content of a BIT STRING with the leading unused-bits byte removed.
    pub fn bit_string_bytes(&self) -> Option<&'a [u8]> {
        if self.tag != tag::BIT_STRING {
            return None;
        }
        self.value.split_first().map(|(_, rest)| rest)
    }
}

/// Forward-only cursor over a sequence of DER elements.
#[derive(Debug, Clone)]
pub struct DerReader<'a> {
    input: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> DerReader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            base: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn position(&self) -> usize {
        self.base + self.pos
    }

    pub fn read_tlv(&mut self) -> Result<Tlv<'a>, DerError> {
        let offset = self.position();
        let tag = *self
            .input
            .get(self.pos)
            .ok_or(DerError::Truncated { offset })?;
        let (len, consumed) = decode_length(&self.input[self.pos + 1..]).map_err(|e| match e {
            DerError::Truncated { .. } => DerError::Truncated { offset },
            DerError::UnsupportedLength { first, .. } => DerError::UnsupportedLength {
                first,
                offset: offset + 1,
            },
            other => other,
        })?;
        let start = self.pos + 1 + consumed;
        let end = start
            .checked_add(len)
            .filter(|end| *end <= self.input.len())
            .ok_or(DerError::Truncated { offset })?;
        self.pos = end;
        Ok(Tlv {
            tag,
            offset,
            header_len: 1 + consumed,
            value: &self.input[start..end],
        })
    }

    pub fn read_expected(&mut self, expected: u8) -> Result<Tlv<'a>, DerError> {
        let tlv = self.read_tlv()?;
        if tlv.tag != expected {
            return Err(DerError::UnexpectedTag {
                expected,
                found: tlv.tag,
                offset: tlv.offset,
            });
        }
        Ok(tlv)
    }
}

/// Build a SEC1 `ECPrivateKey` for secp256k1:
/// `SEQUENCE { INTEGER 1, OCTET STRING key, [0] OID secp256k1, [1] BIT STRING public-key }`.
///
/// # Errors
/// The private scalar must be 32 bytes and the public key, if given, a 65-byte uncompressed point.
pub fn ec_private_key_der(
    private_key: &[u8],
    public_key: Option<&[u8]>,
) -> Result<Vec<u8>, DerError> {
    if private_key.len() != 32 {
        return Err(DerError::InvalidSize {
            field: "private key",
            expected: 32,
            actual: private_key.len(),
        });
    }

    let mut body = encode_tlv(tag::INTEGER, &[0x01]);
    body.extend(encode_tlv(tag::OCTET_STRING, private_key));
    body.extend(encode_tlv(
        tag::CONTEXT_0,
        &encode_tlv(tag::OBJECT_IDENTIFIER, &SECP256K1_OID),
    ));

    if let Some(public_key) = public_key {
        if public_key.len() != 65 || public_key[0] != 0x04 {
            return Err(DerError::InvalidSize {
                field: "uncompressed public key",
                expected: 65,
                actual: public_key.len(),
            });
        }
        let mut bits = Vec::with_capacity(66);
        bits.push(0x00);
        bits.extend_from_slice(public_key);
        body.extend(encode_tlv(
            tag::CONTEXT_1,
            &encode_tlv(tag::BIT_STRING, &bits),
        ));
    }

    Ok(encode_tlv(tag::SEQUENCE, &body))
}
