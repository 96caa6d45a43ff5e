use super::{
    vat_breakdown, Buyer, InvoiceData, InvoiceError, InvoiceFlags, InvoiceNote,
    InvoiceTotalsData, InvoiceType, LineItems, Seller, VatBreakdown,
};
use crate::invoice::sign::{InvoiceSigner, SignedInvoiceResult, SigningError};
use crate::invoice::xml::{self, InvoiceXmlError};
use chrono::{DateTime, Utc};
use iso_currency::Currency;

/// Fields every invoice must provide.
#[derive(Debug, Clone)]
pub struct RequiredInvoiceFields {
    pub invoice_type: InvoiceType,
    pub id: String,
    pub uuid: String,
    pub issue_datetime: DateTime<Utc>,
    pub currency: Currency,
    pub previous_invoice_hash: String,
    pub invoice_counter: u64,
    pub seller: Seller,
    pub line_items: LineItems,
    pub payment_means_code: String,
}

/// Assembles [`InvoiceData`] and validates it into a [`FinalizedInvoice`].
///
/// # Examples
/// ```rust
/// use chrono::TimeZone;
/// use iso_currency::Currency;
/// use isocountry::CountryCode;
/// use zatca_core::invoice::{
///     Address, InvoiceBuilder, InvoiceSubType, InvoiceType, LineItem, LineItemFields,
///     RequiredInvoiceFields, Seller, VatCategory, GENESIS_PREVIOUS_INVOICE_HASH,
/// };
///
/// let seller = Seller::new(
///     "Test Co".into(),
///     Address {
///         country_code: CountryCode::SAU,
///         city: "Riyadh".into(),
///         street: "Olaya".into(),
///         additional_street: None,
///         building_number: "1234".into(),
///         additional_number: None,
///         postal_code: "12345".into(),
///         subdivision: None,
///         district: None,
///     },
///     "300000000000003",
///     None,
/// )?;
/// let invoice = InvoiceBuilder::new(RequiredInvoiceFields {
///     invoice_type: InvoiceType::Tax(InvoiceSubType::Simplified),
///     id: "INV-1".into(),
///     uuid: "3cf5ee18-ee25-44ea-a444-2c37ba7f28be".into(),
///     issue_datetime: chrono::Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
///     currency: Currency::SAR,
///     previous_invoice_hash: GENESIS_PREVIOUS_INVOICE_HASH.into(),
///     invoice_counter: 1,
///     seller,
///     line_items: vec![LineItem::new(LineItemFields {
///         description: "Service".into(),
///         quantity: 1.0,
///         unit_code: "PCE".into(),
///         unit_price: 100.0,
///         vat_rate: 15.0,
///         vat_category: VatCategory::Standard,
///     })],
///     payment_means_code: "10".into(),
/// })
/// .build()?;
/// assert_eq!(invoice.totals().tax_inclusive_amount(), 115.0);
/// # Ok::<(), zatca_core::invoice::InvoiceError>(())
/// ```
#[derive(Debug, Clone)]
pub struct InvoiceBuilder {
    invoice: InvoiceData,
}

impl InvoiceBuilder {
    pub fn new(fields: RequiredInvoiceFields) -> Self {
        Self {
            invoice: InvoiceData {
                invoice_type: fields.invoice_type,
                id: fields.id,
                uuid: fields.uuid,
                issue_datetime: fields.issue_datetime,
                currency: fields.currency,
                previous_invoice_hash: fields.previous_invoice_hash,
                invoice_counter: fields.invoice_counter,
                note: None,
                seller: fields.seller,
                buyer: None,
                line_items: fields.line_items,
                payment_means_code: fields.payment_means_code,
                flags: InvoiceFlags::empty(),
            },
        }
    }

    pub fn note(mut self, note: InvoiceNote) -> Self {
        self.invoice.note = Some(note);
        self
    }

    pub fn buyer(mut self, buyer: Buyer) -> Self {
        self.invoice.buyer = Some(buyer);
        self
    }

    pub fn flags(mut self, flags: InvoiceFlags) -> Self {
        self.invoice.flags = flags;
        self
    }

    /// Validate and compute totals.
    ///
    /// # Errors
    /// Returns the first [`InvoiceError`] found.
    pub fn build(self) -> Result<FinalizedInvoice, InvoiceError> {
        self.invoice.validate()?;
        Ok(FinalizedInvoice {
            totals: InvoiceTotalsData::from_items(&self.invoice.line_items),
            breakdown: vat_breakdown(&self.invoice.line_items),
            data: self.invoice,
        })
    }
}

/// Validated invoice with its totals; line items can no longer change.
#[derive(Debug, Clone)]
pub struct FinalizedInvoice {
    data: InvoiceData,
    totals: InvoiceTotalsData,
    breakdown: Vec<VatBreakdown>,
}

impl FinalizedInvoice {
    pub fn data(&self) -> &InvoiceData {
        &self.data
    }

    pub fn totals(&self) -> &InvoiceTotalsData {
        &self.totals
    }

    /// VAT subtotals in first-seen order.
    pub fn vat_breakdown(&self) -> &[VatBreakdown] {
        &self.breakdown
    }

    /// Unsigned UBL document with signature and QR placeholders.
    pub fn to_unsigned_xml(&self) -> Result<String, InvoiceXmlError> {
        xml::unsigned_invoice_xml(self)
    }

    pub fn sign(&self, signer: &InvoiceSigner) -> Result<SignedInvoiceResult, SigningError> {
        signer.sign(self)
    }
}
