pub const INVOICE_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
pub const CREDIT_NOTE_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:CreditNote-2";
pub const CBC_NS: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
pub const CAC_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
pub const EXT_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";
pub const SIG_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:CommonSignatureComponents-2";
pub const SAC_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:SignatureAggregateComponents-2";
pub const SBC_NS: &str =
    "urn:oasis:names:specification:ubl:schema:xsd:SignatureBasicComponents-2";
pub const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";
pub const XADES_NS: &str = "http://uri.etsi.org/01903/v1.3.2#";

pub const C14N11_ALGORITHM: &str = "http://www.w3.org/2006/12/xml-c14n11";
pub const ECDSA_SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
pub const SHA256_ALGORITHM: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const XPATH_ALGORITHM: &str = "http://www.w3.org/TR/1999/REC-xpath-19991116";
pub const SIGNATURE_PROPERTIES_TYPE: &str = "http://www.w3.org/2000/09/xmldsig#SignatureProperties";

pub const PROFILE_ID: &str = "reporting:1.0";
pub const SIGNATURE_ID: &str = "urn:oasis:names:specification:ubl:signature:Invoice";
pub const SIGNATURE_METHOD: &str = "urn:oasis:names:specification:ubl:dsig:enveloped:xades";
pub const SIGNATURE_INFORMATION_ID: &str = "urn:oasis:names:specification:ubl:signature:1";

/// Marks where the `ext:UBLExtensions` signature block is spliced in.
pub const UBL_EXTENSIONS_PLACEHOLDER: &str = "<!-- ZATCA:UBL_EXTENSIONS -->";
/// Marks where the base64 QR payload is written.
pub const QR_CODE_PLACEHOLDER: &str = "<!-- ZATCA:QR_CODE -->";

/// XPath transforms listed in the invoice `ds:Reference`.
pub const INVOICE_XPATH_TRANSFORMS: [&str; 3] = [
    "not(//ancestor-or-self::ext:UBLExtensions)",
    "not(//ancestor-or-self::cac:Signature)",
    "not(//ancestor-or-self::cac:AdditionalDocumentReference[cbc:ID='QR'])",
];

pub(crate) const QR_REFERENCE_TEMPLATE: &str = r#"<cac:AdditionalDocumentReference>
    <cbc:ID>QR</cbc:ID>
    <cac:Attachment>
        <cbc:EmbeddedDocumentBinaryObject mimeCode="text/plain"><!-- ZATCA:QR_CODE --></cbc:EmbeddedDocumentBinaryObject>
    </cac:Attachment>
</cac:AdditionalDocumentReference>"#;

pub(crate) const CAC_SIGNATURE_TEMPLATE: &str = r#"<cac:Signature>
    <cbc:ID>urn:oasis:names:specification:ubl:signature:Invoice</cbc:ID>
    <cbc:SignatureMethod>urn:oasis:names:specification:ubl:dsig:enveloped:xades</cbc:SignatureMethod>
</cac:Signature>"#;
