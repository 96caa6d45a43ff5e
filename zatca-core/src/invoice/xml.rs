//! UBL 2.1 rendering for invoices and credit notes.
//!
//! Every block of the document has its own renderer so each can be checked on its own; the
//! document is assembled by [`unsigned_invoice_xml`] with placeholder comments where the
//! signature block and the QR payload go once the invoice is signed.
use super::{
    format_amount, Address, Buyer, FinalizedInvoice, InvoiceNote, InvoiceTotalsData, LineItem,
    OriginalInvoiceRef, OtherId, Party, PartyRole, Seller, VatBreakdown, VatCategory, VatId,
};
use constants::{
    CAC_NS, CAC_SIGNATURE_TEMPLATE, CBC_NS, CREDIT_NOTE_NS, EXT_NS, INVOICE_NS, PROFILE_ID,
    QR_CODE_PLACEHOLDER, QR_REFERENCE_TEMPLATE, UBL_EXTENSIONS_PLACEHOLDER,
};
use helpers::{currency_amount, id_with_scheme, id_with_scheme_with_agency, quantity_with_unit, text_element, FixedPrecision};
use quick_xml::se::{SeError, Serializer as QuickXmlSerializer};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

pub mod constants;
pub mod signature;

/// Indentation unit of rendered documents.
pub const INDENT: &str = "    ";

/// XML rendering error.
#[derive(Debug, Error)]
pub enum InvoiceXmlError {
    #[error("failed to serialize invoice to XML: {source}")]
    Serialize {
        #[from]
        source: SeError,
    },
    #[error("placeholder {placeholder} not found in invoice XML")]
    MissingPlaceholder { placeholder: &'static str },
}

type Result<T> = std::result::Result<T, InvoiceXmlError>;

mod helpers {
    use serde::ser::{Serialize, SerializeStruct, Serializer};
    use std::fmt::{self, Display, Formatter};

    pub(super) struct FixedPrecision {
        value: f64,
        precision: usize,
    }

    impl FixedPrecision {
        pub(super) fn new(value: f64, precision: usize) -> Self {
            Self { value, precision }
        }
    }

    impl Display for FixedPrecision {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "{:.*}", self.precision, self.value)
        }
    }

    impl Serialize for FixedPrecision {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    struct TextSer<'a> {
        tag: &'static str,
        text: &'a str,
    }

    pub(super) fn text_element<'a>(tag: &'static str, text: &'a str) -> impl Serialize + 'a {
        TextSer { tag, text }
    }

    impl<'a> Serialize for TextSer<'a> {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut st = s.serialize_struct(self.tag, 1)?;
            st.serialize_field("$text", self.text)?;
            st.end()
        }
    }

    struct CurrencyAmountSer<'a> {
        tag: &'static str,
        currency: &'a str,
        value: f64,
    }

    pub(super) fn currency_amount<'a>(
        tag: &'static str,
        currency: &'a str,
        value: f64,
    ) -> impl Serialize + 'a {
        CurrencyAmountSer {
            tag,
            currency,
            value,
        }
    }

    impl<'a> Serialize for CurrencyAmountSer<'a> {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut st = s.serialize_struct(self.tag, 2)?;
            st.serialize_field("@currencyID", self.currency)?;
            st.serialize_field("$text", &FixedPrecision::new(self.value, 2))?;
            st.end()
        }
    }

    struct IdWithSchemeSer<'a> {
        tag: &'static str,
        scheme_id: &'a str,
        scheme_agency_id: Option<&'a str>,
        value: &'a str,
    }

    pub(super) fn id_with_scheme<'a>(
        tag: &'static str,
        scheme_id: &'a str,
        value: &'a str,
    ) -> impl Serialize + 'a {
        IdWithSchemeSer {
            tag,
            scheme_id,
            scheme_agency_id: None,
            value,
        }
    }

    pub(super) fn id_with_scheme_with_agency<'a>(
        tag: &'static str,
        scheme_id: &'a str,
        scheme_agency_id: &'a str,
        value: &'a str,
    ) -> impl Serialize + 'a {
        IdWithSchemeSer {
            tag,
            scheme_id,
            scheme_agency_id: Some(scheme_agency_id),
            value,
        }
    }

    impl<'a> Serialize for IdWithSchemeSer<'a> {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut st = s.serialize_struct(self.tag, 3)?;
            st.serialize_field("@schemeID", self.scheme_id)?;
            if let Some(agency) = self.scheme_agency_id {
                st.serialize_field("@schemeAgencyID", agency)?;
            }
            st.serialize_field("$text", self.value)?;
            st.end()
        }
    }

    struct QuantityWithUnitSer<'a> {
        tag: &'static str,
        value: f64,
        unit_code: &'a str,
    }

    pub(super) fn quantity_with_unit<'a>(
        tag: &'static str,
        value: f64,
        unit_code: &'a str,
    ) -> impl Serialize + 'a {
        QuantityWithUnitSer {
            tag,
            value,
            unit_code,
        }
    }

    impl<'a> Serialize for QuantityWithUnitSer<'a> {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut st = s.serialize_struct(self.tag, 2)?;
            st.serialize_field("@unitCode", self.unit_code)?;
            st.serialize_field("$text", &FixedPrecision::new(self.value, 6))?;
            st.end()
        }
    }
}

/// Serialize one block with the document indentation.
pub fn render<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = String::with_capacity(512);
    {
        let mut serializer = QuickXmlSerializer::new(&mut buffer);
        serializer.indent(' ', INDENT.len());
        value.serialize(serializer)?;
    }
    Ok(buffer)
}

/// Indent every markup line of `block` after the first by `indent`.
///
/// Lines that do not start with markup are text continuations and are left untouched.
pub fn indent_continuation(block: &str, indent: &str) -> String {
    let mut out = String::with_capacity(block.len() + 64);
    for (i, line) in block.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if line.trim_start().starts_with('<') {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}

struct DocumentWriter {
    root: &'static str,
    buffer: String,
}

impl DocumentWriter {
    fn new(root: &'static str, namespace: &str) -> Self {
        let mut buffer = String::with_capacity(8192);
        buffer.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        buffer.push('\n');
        buffer.push_str(&format!(
            r#"<{root} xmlns="{namespace}" xmlns:cac="{CAC_NS}" xmlns:cbc="{CBC_NS}" xmlns:ext="{EXT_NS}">"#
        ));
        Self { root, buffer }
    }

    fn push(&mut self, block: &str) {
        self.buffer.push('\n');
        self.buffer.push_str(INDENT);
        self.buffer.push_str(&indent_continuation(block, INDENT));
    }

    fn finish(mut self) -> String {
        self.buffer.push_str(&format!("\n</{}>\n", self.root));
        self.buffer
    }
}

struct TypeCodeXml<'a> {
    tag: &'static str,
    name: &'a str,
    code: &'a str,
}

impl<'a> Serialize for TypeCodeXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct(self.tag, 2)?;
        st.serialize_field("@name", self.name)?;
        st.serialize_field("$text", self.code)?;
        st.end()
    }
}

struct NoteXml<'a>(&'a InvoiceNote);

impl<'a> Serialize for NoteXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cbc:Note", 2)?;
        st.serialize_field("@languageID", self.0.language())?;
        st.serialize_field("$text", self.0.text())?;
        st.end()
    }
}

struct BillingReferenceXml<'a>(&'a OriginalInvoiceRef);

struct InvoiceDocumentReferenceXml<'a>(&'a OriginalInvoiceRef);

impl<'a> Serialize for InvoiceDocumentReferenceXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:InvoiceDocumentReference", 0)?;
        st.serialize_field("cbc:ID", self.0.id())?;
        if let Some(uuid) = self.0.uuid() {
            st.serialize_field("cbc:UUID", uuid)?;
        }
        if let Some(issue_date) = self.0.issue_date() {
            st.serialize_field("cbc:IssueDate", &issue_date.format("%Y-%m-%d").to_string())?;
        }
        st.end()
    }
}

impl<'a> Serialize for BillingReferenceXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:BillingReference", 0)?;
        st.serialize_field(
            "cac:InvoiceDocumentReference",
            &InvoiceDocumentReferenceXml(self.0),
        )?;
        st.end()
    }
}

enum AdditionalDocumentReferenceXml<'a> {
    InvoiceCounter(&'a str),
    PreviousInvoiceHash(&'a str),
}

struct AttachmentXml<'a>(&'a str);

impl<'a> Serialize for AttachmentXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct EmbeddedDocumentXml<'a>(&'a str);

        impl<'a> Serialize for EmbeddedDocumentXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut st = s.serialize_struct("cbc:EmbeddedDocumentBinaryObject", 2)?;
                st.serialize_field("@mimeCode", "text/plain")?;
                st.serialize_field("$text", self.0)?;
                st.end()
            }
        }

        let mut st = s.serialize_struct("cac:Attachment", 0)?;
        st.serialize_field("cbc:EmbeddedDocumentBinaryObject", &EmbeddedDocumentXml(self.0))?;
        st.end()
    }
}

impl<'a> Serialize for AdditionalDocumentReferenceXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:AdditionalDocumentReference", 0)?;
        match self {
            AdditionalDocumentReferenceXml::InvoiceCounter(value) => {
                st.serialize_field("cbc:ID", "ICV")?;
                st.serialize_field("cbc:UUID", value)?;
            }
            AdditionalDocumentReferenceXml::PreviousInvoiceHash(value) => {
                st.serialize_field("cbc:ID", "PIH")?;
                st.serialize_field("cac:Attachment", &AttachmentXml(value))?;
            }
        }
        st.end()
    }
}

struct TaxSchemeXml;

impl Serialize for TaxSchemeXml {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:TaxScheme", 0)?;
        st.serialize_field(
            "cbc:ID",
            &id_with_scheme_with_agency("cbc:ID", "UN/ECE 5153", "6", "VAT"),
        )?;
        st.end()
    }
}

struct PartyTaxSchemeXml<'a>(&'a VatId);

impl<'a> Serialize for PartyTaxSchemeXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:PartyTaxScheme", 0)?;
        st.serialize_field("cbc:CompanyID", self.0.as_str())?;
        st.serialize_field("cac:TaxScheme", &TaxSchemeXml)?;
        st.end()
    }
}

struct PartyIdentificationXml<'a>(&'a OtherId);

impl<'a> Serialize for PartyIdentificationXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let other_id = self.0;
        let mut st = s.serialize_struct("cac:PartyIdentification", 0)?;
        match other_id.scheme_id() {
            Some(scheme_id) => st.serialize_field(
                "cbc:ID",
                &id_with_scheme("cbc:ID", scheme_id, other_id.as_str()),
            )?,
            None => st.serialize_field("cbc:ID", other_id.as_str())?,
        }
        st.end()
    }
}

struct AddressXml<'a>(&'a Address);

impl<'a> Serialize for AddressXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct CountryXml<'a>(&'a str);

        impl<'a> Serialize for CountryXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut st = s.serialize_struct("cac:Country", 0)?;
                st.serialize_field("cbc:IdentificationCode", self.0)?;
                st.end()
            }
        }

        let a = self.0;
        let mut st = s.serialize_struct("cac:PostalAddress", 0)?;
        st.serialize_field("cbc:StreetName", &a.street)?;
        if let Some(additional) = &a.additional_street {
            st.serialize_field("cbc:AdditionalStreetName", additional)?;
        }
        st.serialize_field("cbc:BuildingNumber", &a.building_number)?;
        if let Some(plot) = &a.additional_number {
            st.serialize_field("cbc:PlotIdentification", plot)?;
        }
        if let Some(district) = &a.district {
            st.serialize_field("cbc:CitySubdivisionName", district)?;
        }
        st.serialize_field("cbc:CityName", &a.city)?;
        st.serialize_field("cbc:PostalZone", &a.postal_code)?;
        if let Some(subdivision) = &a.subdivision {
            st.serialize_field("cbc:CountrySubentity", subdivision)?;
        }
        st.serialize_field("cac:Country", &CountryXml(a.country_code.alpha2()))?;
        st.end()
    }
}

struct PartyXml<'a, R: PartyRole>(&'a Party<R>);

impl<'a, R: PartyRole> Serialize for PartyXml<'a, R> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct LegalEntityXml<'a>(&'a str);

        impl<'a> Serialize for LegalEntityXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut st = s.serialize_struct("cac:PartyLegalEntity", 0)?;
                st.serialize_field("cbc:RegistrationName", self.0)?;
                st.end()
            }
        }

        let p = self.0;
        let mut st = s.serialize_struct("cac:Party", 0)?;
        if let Some(other_id) = p.other_id() {
            st.serialize_field("cac:PartyIdentification", &PartyIdentificationXml(other_id))?;
        }
        st.serialize_field("cac:PostalAddress", &AddressXml(p.address()))?;
        if let Some(vat) = p.vat_id() {
            st.serialize_field("cac:PartyTaxScheme", &PartyTaxSchemeXml(vat))?;
        }
        st.serialize_field("cac:PartyLegalEntity", &LegalEntityXml(p.name()))?;
        st.end()
    }
}

struct EmptyParty;

impl Serialize for EmptyParty {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_struct("cac:Party", 0)?.end()
    }
}

struct PartyRoleXml<'a, R: PartyRole> {
    tag: &'static str,
    party: Option<&'a Party<R>>,
}

impl<'a, R: PartyRole> Serialize for PartyRoleXml<'a, R> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct(self.tag, 0)?;
        match self.party {
            Some(party) => st.serialize_field("cac:Party", &PartyXml(party))?,
            None => st.serialize_field("cac:Party", &EmptyParty)?,
        }
        st.end()
    }
}

struct TaxCategoryXml<'a> {
    tag: &'static str,
    category: VatCategory,
    percent: f64,
    exemption: Option<&'a super::TaxExemption>,
}

impl<'a> Serialize for TaxCategoryXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct(self.tag, 0)?;
        st.serialize_field(
            "cbc:ID",
            &id_with_scheme_with_agency("cbc:ID", "UN/ECE 5305", "6", self.category.code()),
        )?;
        st.serialize_field("cbc:Percent", &FixedPrecision::new(self.percent, 2))?;
        if let Some(exemption) = self.exemption {
            st.serialize_field("cbc:TaxExemptionReasonCode", &exemption.code)?;
            st.serialize_field("cbc:TaxExemptionReason", &exemption.reason)?;
        }
        st.serialize_field("cac:TaxScheme", &TaxSchemeXml)?;
        st.end()
    }
}

struct TaxSubtotalXml<'a> {
    currency: &'a str,
    group: &'a VatBreakdown,
}

impl<'a> Serialize for TaxSubtotalXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let group = self.group;
        let mut st = s.serialize_struct("cac:TaxSubtotal", 0)?;
        st.serialize_field(
            "cbc:TaxableAmount",
            &currency_amount("cbc:TaxableAmount", self.currency, group.taxable_amount),
        )?;
        st.serialize_field(
            "cbc:TaxAmount",
            &currency_amount("cbc:TaxAmount", self.currency, group.tax_amount),
        )?;
        st.serialize_field(
            "cac:TaxCategory",
            &TaxCategoryXml {
                tag: "cac:TaxCategory",
                category: group.category,
                percent: group.rate,
                exemption: group.exemption.as_ref(),
            },
        )?;
        st.end()
    }
}

struct TaxTotalXml<'a> {
    currency: &'a str,
    amount: f64,
    breakdown: &'a [VatBreakdown],
}

impl<'a> Serialize for TaxTotalXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:TaxTotal", 0)?;
        st.serialize_field(
            "cbc:TaxAmount",
            &currency_amount("cbc:TaxAmount", self.currency, self.amount),
        )?;
        for group in self.breakdown {
            st.serialize_field(
                "cac:TaxSubtotal",
                &TaxSubtotalXml {
                    currency: self.currency,
                    group,
                },
            )?;
        }
        st.end()
    }
}

struct LegalMonetaryTotalXml<'a> {
    currency: &'a str,
    totals: &'a InvoiceTotalsData,
}

impl<'a> Serialize for LegalMonetaryTotalXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let (c, t) = (self.currency, self.totals);
        let mut st = s.serialize_struct("cac:LegalMonetaryTotal", 0)?;
        st.serialize_field(
            "cbc:LineExtensionAmount",
            &currency_amount("cbc:LineExtensionAmount", c, t.line_extension()),
        )?;
        st.serialize_field(
            "cbc:TaxExclusiveAmount",
            &currency_amount("cbc:TaxExclusiveAmount", c, t.tax_exclusive_amount()),
        )?;
        st.serialize_field(
            "cbc:TaxInclusiveAmount",
            &currency_amount("cbc:TaxInclusiveAmount", c, t.tax_inclusive_amount()),
        )?;
        st.serialize_field(
            "cbc:AllowanceTotalAmount",
            &currency_amount("cbc:AllowanceTotalAmount", c, 0.0),
        )?;
        st.serialize_field(
            "cbc:PrepaidAmount",
            &currency_amount("cbc:PrepaidAmount", c, 0.0),
        )?;
        st.serialize_field(
            "cbc:PayableAmount",
            &currency_amount("cbc:PayableAmount", c, t.tax_inclusive_amount()),
        )?;
        st.end()
    }
}

struct PaymentMeansXml<'a> {
    code: &'a str,
    instruction_note: Option<&'a str>,
}

impl<'a> Serialize for PaymentMeansXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("cac:PaymentMeans", 0)?;
        st.serialize_field("cbc:PaymentMeansCode", self.code)?;
        if let Some(note) = self.instruction_note {
            st.serialize_field("cbc:InstructionNote", note)?;
        }
        st.end()
    }
}

struct LineXml<'a> {
    index: usize,
    item: &'a LineItem,
    currency: &'a str,
    credit_note: bool,
}

impl<'a> Serialize for LineXml<'a> {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        struct LineTaxTotalXml<'a>(&'a str, &'a LineItem);

        impl<'a> Serialize for LineTaxTotalXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let (currency, item) = (self.0, self.1);
                let mut st = s.serialize_struct("cac:TaxTotal", 0)?;
                st.serialize_field(
                    "cbc:TaxAmount",
                    &currency_amount("cbc:TaxAmount", currency, item.vat_amount()),
                )?;
                st.serialize_field(
                    "cbc:RoundingAmount",
                    &currency_amount(
                        "cbc:RoundingAmount",
                        currency,
                        item.total_amount() + item.vat_amount(),
                    ),
                )?;
                st.end()
            }
        }

        struct ItemXml<'a>(&'a LineItem);

        impl<'a> Serialize for ItemXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut st = s.serialize_struct("cac:Item", 0)?;
                st.serialize_field("cbc:Name", self.0.description())?;
                st.serialize_field(
                    "cac:ClassifiedTaxCategory",
                    &TaxCategoryXml {
                        tag: "cac:ClassifiedTaxCategory",
                        category: self.0.vat_category(),
                        percent: self.0.vat_rate(),
                        exemption: None,
                    },
                )?;
                st.end()
            }
        }

        struct PriceXml<'a>(&'a str, f64);

        impl<'a> Serialize for PriceXml<'a> {
            fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                let mut st = s.serialize_struct("cac:Price", 0)?;
                st.serialize_field(
                    "cbc:PriceAmount",
                    &currency_amount("cbc:PriceAmount", self.0, self.1),
                )?;
                st.end()
            }
        }

        let (line_tag, quantity_tag) = if self.credit_note {
            ("cac:CreditNoteLine", "cbc:CreditedQuantity")
        } else {
            ("cac:InvoiceLine", "cbc:InvoicedQuantity")
        };
        let item = self.item;
        let mut st = s.serialize_struct(line_tag, 0)?;
        st.serialize_field("cbc:ID", &self.index.to_string())?;
        st.serialize_field(
            quantity_tag,
            &quantity_with_unit(quantity_tag, item.quantity(), item.unit_code()),
        )?;
        st.serialize_field(
            "cbc:LineExtensionAmount",
            &currency_amount("cbc:LineExtensionAmount", self.currency, item.total_amount()),
        )?;
        st.serialize_field("cac:TaxTotal", &LineTaxTotalXml(self.currency, item))?;
        st.serialize_field("cac:Item", &ItemXml(item))?;
        st.serialize_field("cac:Price", &PriceXml(self.currency, item.unit_price()))?;
        st.end()
    }
}

/// ICV and PIH references.
pub fn additional_references_xml(invoice_counter: u64, previous_invoice_hash: &str) -> Result<String> {
    let counter = invoice_counter.to_string();
    Ok(format!(
        "{}\n{}",
        render(&AdditionalDocumentReferenceXml::InvoiceCounter(&counter))?,
        render(&AdditionalDocumentReferenceXml::PreviousInvoiceHash(
            previous_invoice_hash.trim()
        ))?
    ))
}

pub fn supplier_party_xml(seller: &Seller) -> Result<String> {
    render(&PartyRoleXml {
        tag: "cac:AccountingSupplierParty",
        party: Some(seller),
    })
}

/// Simplified invoices may omit the buyer; an empty `cac:Party` is rendered instead.
pub fn customer_party_xml(buyer: Option<&Buyer>) -> Result<String> {
    render(&PartyRoleXml {
        tag: "cac:AccountingCustomerParty",
        party: buyer,
    })
}

/// The two `cac:TaxTotal` blocks: the document total, then the total with one subtotal per group.
pub fn tax_totals_xml(currency: &str, tax_amount: f64, breakdown: &[VatBreakdown]) -> Result<String> {
    Ok(format!(
        "{}\n{}",
        render(&TaxTotalXml {
            currency,
            amount: tax_amount,
            breakdown: &[],
        })?,
        render(&TaxTotalXml {
            currency,
            amount: tax_amount,
            breakdown,
        })?
    ))
}

pub fn legal_monetary_total_xml(currency: &str, totals: &InvoiceTotalsData) -> Result<String> {
    render(&LegalMonetaryTotalXml { currency, totals })
}

/// One invoice line; credit notes use `cac:CreditNoteLine` and `cbc:CreditedQuantity`.
pub fn invoice_line_xml(
    index: usize,
    item: &LineItem,
    currency: &str,
    credit_note: bool,
) -> Result<String> {
    render(&LineXml {
        index,
        item,
        currency,
        credit_note,
    })
}

/// Render the unsigned document.
///
/// The result carries [`UBL_EXTENSIONS_PLACEHOLDER`] and [`QR_CODE_PLACEHOLDER`]; both sit in
/// subtrees that are excluded from the invoice hash, so hashing the unsigned document gives the
/// same digest as hashing the signed one.
pub fn unsigned_invoice_xml(invoice: &FinalizedInvoice) -> Result<String> {
    let data = invoice.data();
    let invoice_type = data.invoice_type();
    let currency = data.currency().code();
    let credit_note = invoice_type.is_credit_note();

    let mut doc = if credit_note {
        DocumentWriter::new("CreditNote", CREDIT_NOTE_NS)
    } else {
        DocumentWriter::new("Invoice", INVOICE_NS)
    };

    doc.push(UBL_EXTENSIONS_PLACEHOLDER);
    doc.push(&render(&text_element("cbc:ProfileID", PROFILE_ID))?);
    doc.push(&render(&text_element("cbc:ID", data.id()))?);
    doc.push(&render(&text_element("cbc:UUID", data.uuid()))?);
    doc.push(&render(&text_element("cbc:IssueDate", &data.issue_date_string()))?);
    doc.push(&render(&text_element("cbc:IssueTime", &data.issue_time_string()))?);
    doc.push(&render(&TypeCodeXml {
        tag: if credit_note {
            "cbc:CreditNoteTypeCode"
        } else {
            "cbc:InvoiceTypeCode"
        },
        name: &data.type_code_name(),
        code: invoice_type.type_code(),
    })?);
    if let Some(note) = data.note() {
        doc.push(&render(&NoteXml(note))?);
    }
    doc.push(&render(&text_element("cbc:DocumentCurrencyCode", currency))?);
    doc.push(&render(&text_element("cbc:TaxCurrencyCode", currency))?);
    if let Some(original) = invoice_type.original_invoice() {
        doc.push(&render(&BillingReferenceXml(original))?);
    }
    doc.push(&additional_references_xml(
        data.invoice_counter(),
        data.previous_invoice_hash(),
    )?);
    doc.push(QR_REFERENCE_TEMPLATE);
    doc.push(CAC_SIGNATURE_TEMPLATE);
    doc.push(&supplier_party_xml(data.seller())?);
    doc.push(&customer_party_xml(data.buyer())?);
    doc.push(&render(&PaymentMeansXml {
        code: data.payment_means_code(),
        instruction_note: invoice_type.reason(),
    })?);
    doc.push(&tax_totals_xml(
        currency,
        invoice.totals().tax_amount(),
        invoice.vat_breakdown(),
    )?);
    doc.push(&legal_monetary_total_xml(currency, invoice.totals())?);
    for (index, item) in data.line_items().iter().enumerate() {
        doc.push(&invoice_line_xml(index + 1, item, currency, credit_note)?);
    }

    tracing::debug!(
        id = data.id(),
        lines = data.line_items().len(),
        total = %format_amount(invoice.totals().tax_inclusive_amount()),
        "rendered unsigned invoice"
    );
    Ok(doc.finish())
}

/// Splice the `ext:UBLExtensions` block into the extensions placeholder.
pub fn embed_signature(xml: &str, ubl_extensions: &str) -> Result<String> {
    replace_placeholder(
        xml,
        UBL_EXTENSIONS_PLACEHOLDER,
        &indent_continuation(ubl_extensions, INDENT),
    )
}

/// Write the base64 QR payload into the QR placeholder.
pub fn embed_qr(xml: &str, qr_base64: &str) -> Result<String> {
    replace_placeholder(xml, QR_CODE_PLACEHOLDER, qr_base64)
}

fn replace_placeholder(xml: &str, placeholder: &'static str, value: &str) -> Result<String> {
    if !xml.contains(placeholder) {
        return Err(InvoiceXmlError::MissingPlaceholder { placeholder });
    }
    Ok(xml.replacen(placeholder, value, 1))
}
