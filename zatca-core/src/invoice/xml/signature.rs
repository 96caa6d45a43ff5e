//! XAdES `SignedProperties`, XMLDSig `SignedInfo` and the enveloping `ext:UBLExtensions` block.
use super::constants::{
    C14N11_ALGORITHM, DS_NS, ECDSA_SHA256_ALGORITHM, INVOICE_XPATH_TRANSFORMS, SAC_NS,
    SHA256_ALGORITHM, SIGNATURE_ID, SIGNATURE_INFORMATION_ID, SIGNATURE_METHOD,
    SIGNATURE_PROPERTIES_TYPE, SBC_NS, SIG_NS, XADES_NS, XPATH_ALGORITHM,
};
use quick_xml::escape::partial_escape;

/// Inputs of the XAdES `SignedProperties` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPropertiesFields<'a> {
    /// `YYYY-MM-DDTHH:MM:SSZ`.
    pub signing_time: &'a str,
    /// base64 SHA-256 of the certificate DER.
    pub certificate_digest: &'a str,
    pub issuer_name: &'a str,
    /// Decimal serial number.
    pub serial_number: &'a str,
}

/// Strip line breaks and drop whitespace-only runs between tags.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::xml::signature::linearize;
///
/// assert_eq!(linearize("<a>\n    <b> x </b>\n</a>\n"), "<a><b> x </b></a>");
/// ```
pub fn linearize(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut pending = String::new();
    let mut after_tag = false;
    for c in xml.chars().filter(|c| *c != '\n' && *c != '\r') {
        if after_tag && c.is_whitespace() {
            pending.push(c);
            continue;
        }
        if c != '<' {
            out.push_str(&pending);
        }
        pending.clear();
        after_tag = c == '>';
        out.push(c);
    }
    out
}

/// Linearized `xades:SignedProperties`.
///
/// The fragment is already in canonical form: namespace declarations precede attributes, every
/// `ds:` element declares its own namespace and empty elements are written out in full, so the
/// digest of this string is the digest a C14N processor computes.
pub fn signed_properties_xml(fields: &SignedPropertiesFields<'_>) -> String {
    let pretty = format!(
        r#"<xades:SignedProperties xmlns:xades="{XADES_NS}" Id="xadesSignedProperties">
    <xades:SignedSignatureProperties>
        <xades:SigningTime>{signing_time}</xades:SigningTime>
        <xades:SigningCertificate>
            <xades:Cert>
                <xades:CertDigest>
                    <ds:DigestMethod xmlns:ds="{DS_NS}" Algorithm="{SHA256_ALGORITHM}"></ds:DigestMethod>
                    <ds:DigestValue xmlns:ds="{DS_NS}">{digest}</ds:DigestValue>
                </xades:CertDigest>
                <xades:IssuerSerial>
                    <ds:X509IssuerName xmlns:ds="{DS_NS}">{issuer}</ds:X509IssuerName>
                    <ds:X509SerialNumber xmlns:ds="{DS_NS}">{serial}</ds:X509SerialNumber>
                </xades:IssuerSerial>
            </xades:Cert>
        </xades:SigningCertificate>
    </xades:SignedSignatureProperties>
</xades:SignedProperties>"#,
        signing_time = partial_escape(fields.signing_time),
        digest = partial_escape(fields.certificate_digest),
        issuer = partial_escape(fields.issuer_name),
        serial = partial_escape(fields.serial_number),
    );
    linearize(&pretty)
}

/// Linearized `ds:SignedInfo` over the invoice digest and the `SignedProperties` digest.
pub fn signed_info_xml(invoice_digest: &str, signed_properties_digest: &str) -> String {
    let transforms: String = INVOICE_XPATH_TRANSFORMS
        .iter()
        .map(|xpath| {
            format!(
                r#"<ds:Transform Algorithm="{XPATH_ALGORITHM}"><ds:XPath>{xpath}</ds:XPath></ds:Transform>"#
            )
        })
        .collect();
    let pretty = format!(
        r##"<ds:SignedInfo xmlns:ds="{DS_NS}">
    <ds:CanonicalizationMethod Algorithm="{C14N11_ALGORITHM}"></ds:CanonicalizationMethod>
    <ds:SignatureMethod Algorithm="{ECDSA_SHA256_ALGORITHM}"></ds:SignatureMethod>
    <ds:Reference Id="invoiceSignedData" URI="">
        <ds:Transforms>
            {transforms}
            <ds:Transform Algorithm="{C14N11_ALGORITHM}"></ds:Transform>
        </ds:Transforms>
        <ds:DigestMethod Algorithm="{SHA256_ALGORITHM}"></ds:DigestMethod>
        <ds:DigestValue>{invoice_digest}</ds:DigestValue>
    </ds:Reference>
    <ds:Reference Type="{SIGNATURE_PROPERTIES_TYPE}" URI="#xadesSignedProperties">
        <ds:DigestMethod Algorithm="{SHA256_ALGORITHM}"></ds:DigestMethod>
        <ds:DigestValue>{properties_digest}</ds:DigestValue>
    </ds:Reference>
</ds:SignedInfo>"##,
        invoice_digest = partial_escape(invoice_digest),
        properties_digest = partial_escape(signed_properties_digest),
    );
    linearize(&pretty)
}

/// The full `ext:UBLExtensions` block carrying the enveloped signature.
///
/// `signed_info` and `signed_properties` are embedded byte for byte, so their digests can be
/// recomputed from the signed document.
pub fn ubl_extensions_xml(
    signed_info: &str,
    signature_value: &str,
    certificate_base64: &str,
    signed_properties: &str,
) -> String {
    format!(
        r#"<ext:UBLExtensions>
    <ext:UBLExtension>
        <ext:ExtensionURI>{SIGNATURE_METHOD}</ext:ExtensionURI>
        <ext:ExtensionContent>
            <sig:UBLDocumentSignatures xmlns:sig="{SIG_NS}" xmlns:sac="{SAC_NS}" xmlns:sbc="{SBC_NS}">
                <sac:SignatureInformation>
                    <cbc:ID>{SIGNATURE_INFORMATION_ID}</cbc:ID>
                    <sbc:ReferencedSignatureID>{SIGNATURE_ID}</sbc:ReferencedSignatureID>
                    <ds:Signature xmlns:ds="{DS_NS}" Id="signature">
                        {signed_info}
                        <ds:SignatureValue>{signature_value}</ds:SignatureValue>
                        <ds:KeyInfo>
                            <ds:X509Data>
                                <ds:X509Certificate>{certificate}</ds:X509Certificate>
                            </ds:X509Data>
                        </ds:KeyInfo>
                        <ds:Object>
                            <xades:QualifyingProperties xmlns:xades="{XADES_NS}" Target="signature">
                                {signed_properties}
                            </xades:QualifyingProperties>
                        </ds:Object>
                    </ds:Signature>
                </sac:SignatureInformation>
            </sig:UBLDocumentSignatures>
        </ext:ExtensionContent>
    </ext:UBLExtension>
</ext:UBLExtensions>"#,
        signature_value = partial_escape(signature_value),
        certificate = partial_escape(certificate_base64),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::canonical::canonicalize;

    fn fields() -> SignedPropertiesFields<'static> {
        SignedPropertiesFields {
            signing_time: "2024-01-01T10:00:00Z",
            certificate_digest: "ZDMwMmI0MTE1NzVjOTU2NTk4YzVlODhhYmI0ODU2NDUyNTU2YTVhYjhhMDFmN2FjYjk1YTA2OWQ0NjY2MjQ4NQ==",
            issuer_name: "CN=TSZEINVOICE-SubCA-1, DC=extgazt, DC=gov, DC=local",
            serial_number: "379112742831380471835263969587287663520528387",
        }
    }

    #[test]
    fn signed_properties_is_single_line_with_expected_layout() {
        let xml = signed_properties_xml(&fields());
        assert!(!xml.contains('\n'));
        assert!(xml.starts_with(&format!(
            "<xades:SignedProperties xmlns:xades=\"{XADES_NS}\" Id=\"xadesSignedProperties\"><xades:SignedSignatureProperties><xades:SigningTime>2024-01-01T10:00:00Z</xades:SigningTime>"
        )));
        assert!(xml.contains(&format!(
            "<ds:X509IssuerName xmlns:ds=\"{DS_NS}\">CN=TSZEINVOICE-SubCA-1, DC=extgazt, DC=gov, DC=local</ds:X509IssuerName>"
        )));
    }

    #[test]
    fn signed_properties_is_a_canonical_fixed_point() {
        let mut f = fields();
        f.issuer_name = "CN=R&D <Lab>, O=\"Quoted\"";
        let xml = signed_properties_xml(&f);
        assert!(xml.contains("CN=R&amp;D &lt;Lab&gt;, O=\"Quoted\""));
        assert_eq!(canonicalize(&xml).expect("c14n"), xml);
    }

    #[test]
    fn signed_info_is_a_canonical_fixed_point() {
        let xml = signed_info_xml("aW52b2ljZQ==", "cHJvcHM=");
        assert_eq!(canonicalize(&xml).expect("c14n"), xml);
        assert_eq!(xml.matches("<ds:Transform ").count(), 4);
        assert!(xml.contains("<ds:Reference Id=\"invoiceSignedData\" URI=\"\">"));
        assert!(xml.contains("<ds:XPath>not(//ancestor-or-self::cac:AdditionalDocumentReference[cbc:ID='QR'])</ds:XPath>"));
        assert!(xml.contains("<ds:DigestValue>cHJvcHM=</ds:DigestValue></ds:Reference></ds:SignedInfo>"));
    }

    #[test]
    fn signed_info_references_signed_properties_by_fragment() {
        let xml = signed_info_xml("aW52b2ljZQ==", "cHJvcHM=");
        assert!(xml.contains(&format!(
            "<ds:Reference Type=\"{SIGNATURE_PROPERTIES_TYPE}\" URI=\"#xadesSignedProperties\"><ds:DigestMethod Algorithm=\"{SHA256_ALGORITHM}\"></ds:DigestMethod><ds:DigestValue>cHJvcHM=</ds:DigestValue>"
        )));
    }

    #[test]
    fn extension_block_embeds_fragments_verbatim() {
        let info = signed_info_xml("aW52b2ljZQ==", "cHJvcHM=");
        let props = signed_properties_xml(&fields());
        let block = ubl_extensions_xml(&info, "c2lnbmF0dXJl", "Y2VydA==", &props);
        assert!(block.starts_with("<ext:UBLExtensions>"));
        assert!(block.contains(&info));
        assert!(block.contains(&props));
        assert!(block.contains("<ds:SignatureValue>c2lnbmF0dXJl</ds:SignatureValue>"));
        assert!(block.contains("<ds:X509Certificate>Y2VydA==</ds:X509Certificate>"));
    }
}
