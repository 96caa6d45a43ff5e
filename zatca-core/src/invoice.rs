//! Invoice domain model: parties, line items, totals and VAT grouping.
mod builder;
pub mod canonical;
pub mod qr;
pub mod sign;
pub mod xml;

pub use builder::{FinalizedInvoice, InvoiceBuilder, RequiredInvoiceFields};
pub use qr::{
    decode_tlv, generate_phase1_qr, generate_phase2_qr, Phase1QrFields, Phase2QrFields,
    QrCodeError,
};

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use iso_currency::Currency;
use isocountry::CountryCode;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::str::FromStr;
use thiserror::Error;

type Result<T> = std::result::Result<T, InvoiceError>;

/// `previousInvoiceHash` for the first invoice of a chain: base64 of the hex SHA-256 of `"0"`.
pub const GENESIS_PREVIOUS_INVOICE_HASH: &str =
    "NWZlY2ViNjZmZmM4NmYzOGQ5NTI3ODZjNmQ2OTZjNzljMmRiYzIzOWRkNGU5MWI0NjcyOWQ3M2EyN2ZiNTdlOQ==";

/// Invoice-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("invalid VAT number {value:?}")]
    InvalidVatFormat { value: String },
    #[error("buyer needs a VAT number or another identifier")]
    MissingBuyerId,
    #[error("standard invoices require a buyer")]
    MissingBuyer,
    #[error("invoice has no line items")]
    MissingLineItems,
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },
    #[error("invoice counter must start at 1")]
    InvalidInvoiceCounter,
    #[error("previous invoice hash is not valid base64")]
    InvalidPreviousInvoiceHash,
    #[error("line item {index}: {reason}")]
    InvalidLineItem { index: usize, reason: String },
}

/// Postal address for parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub country_code: CountryCode,
    pub city: String,
    pub street: String,
    pub additional_street: Option<String>,
    pub building_number: String,
    pub additional_number: Option<String>,
    pub postal_code: String,
    pub subdivision: Option<String>,
    pub district: Option<String>,
}

/// VAT registration number.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::VatId;
///
/// let vat = VatId::parse(" 399999999900003 ")?;
/// assert_eq!(vat.as_str(), "399999999900003");
/// # Ok::<(), zatca_core::invoice::InvoiceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VatId(String);

impl VatId {
    /// Trim and check the value; Saudi numbers (all digits) must be 15 long and start and end with `3`.
    pub fn parse<S: Into<String>>(s: S) -> Result<Self> {
        let value = s.into().trim().to_string();
        let digits_only = value.chars().all(|c| c.is_ascii_digit());
        let saudi_ok = value.len() == 15 && value.starts_with('3') && value.ends_with('3');
        if value.is_empty() || (digits_only && !saudi_ok) {
            return Err(InvoiceError::InvalidVatFormat { value });
        }
        Ok(VatId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VatId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for VatId {
    type Err = InvoiceError;
    fn from_str(s: &str) -> Result<Self> {
        VatId::parse(s)
    }
}

/// Additional party identifier such as a commercial registration number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherId {
    value: String,
    scheme_id: Option<String>,
}

impl OtherId {
    pub fn new<S: Into<String>>(value: S) -> Self {
        OtherId {
            value: value.into(),
            scheme_id: None,
        }
    }

    pub fn with_scheme<V: Into<String>, S: Into<String>>(value: V, scheme_id: S) -> Self {
        OtherId {
            value: value.into(),
            scheme_id: Some(scheme_id.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme_id(&self) -> Option<&str> {
        self.scheme_id.as_deref()
    }
}

/// Invoice note with its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNote {
    language: String,
    text: String,
}

impl InvoiceNote {
    pub fn new(language: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Marker trait for party role types.
pub trait PartyRole {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerRole;
impl PartyRole for SellerRole {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerRole;
impl PartyRole for BuyerRole {}

/// Invoice party; the role parameter decides which identifiers are mandatory.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::{Address, OtherId, Seller};
/// use isocountry::CountryCode;
///
/// let seller = Seller::new(
///     "Maximum Speed Tech Supply LTD".into(),
///     Address {
///         country_code: CountryCode::SAU,
///         city: "Riyadh".into(),
///         street: "Prince Sultan".into(),
///         additional_street: None,
///         building_number: "2322".into(),
///         additional_number: None,
///         postal_code: "23333".into(),
///         subdivision: None,
///         district: Some("Al-Murabba".into()),
///     },
///     "399999999900003",
///     Some(OtherId::with_scheme("1010010000", "CRN")),
/// )?;
/// assert_eq!(seller.vat_id().map(|v| v.as_str()), Some("399999999900003"));
/// # Ok::<(), zatca_core::invoice::InvoiceError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party<R: PartyRole> {
    _marker: PhantomData<R>,
    name: String,
    address: Address,
    vat_id: Option<VatId>,
    other_id: Option<OtherId>,
}

pub type Seller = Party<SellerRole>;
pub type Buyer = Party<BuyerRole>;

impl Party<SellerRole> {
    /// Sellers always carry a VAT number.
    pub fn new(
        name: String,
        address: Address,
        vat_id: impl Into<String>,
        other_id: Option<OtherId>,
    ) -> Result<Self> {
        Ok(Party {
            _marker: PhantomData,
            name,
            address,
            vat_id: Some(VatId::parse(vat_id)?),
            other_id,
        })
    }
}

impl Party<BuyerRole> {
    /// Buyers need either a VAT number or another identifier.
    pub fn new(
        name: String,
        address: Address,
        vat_id: Option<String>,
        other_id: Option<OtherId>,
    ) -> Result<Self> {
        let vat_id = vat_id.map(VatId::parse).transpose()?;
        if vat_id.is_none() && other_id.is_none() {
            return Err(InvoiceError::MissingBuyerId);
        }
        Ok(Party {
            _marker: PhantomData,
            name,
            address,
            vat_id,
            other_id,
        })
    }
}

impl<R: PartyRole> Party<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn vat_id(&self) -> Option<&VatId> {
        self.vat_id.as_ref()
    }

    pub fn other_id(&self) -> Option<&OtherId> {
        self.other_id.as_ref()
    }
}

/// Standard (B2B, cleared) or simplified (B2C, reported).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceSubType {
    Simplified,
    Standard,
}

/// Reference to the invoice a credit or debit note corrects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalInvoiceRef {
    id: String,
    uuid: Option<String>,
    issue_date: Option<chrono::NaiveDate>,
}

impl OriginalInvoiceRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: None,
            issue_date: None,
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = Some(uuid.into());
        self
    }

    pub fn with_issue_date(mut self, issue_date: chrono::NaiveDate) -> Self {
        self.issue_date = Some(issue_date);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn issue_date(&self) -> Option<chrono::NaiveDate> {
        self.issue_date
    }
}

/// Invoice type and the metadata each kind requires.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::{InvoiceSubType, InvoiceType, OriginalInvoiceRef};
///
/// let note = InvoiceType::CreditNote(
///     InvoiceSubType::Simplified,
///     OriginalInvoiceRef::new("SME00010"),
///     "returned goods".into(),
/// );
/// assert_eq!(note.type_code(), "381");
/// assert!(note.is_credit_note());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceType {
    Tax(InvoiceSubType),
    Prepayment(InvoiceSubType),
    /// Original invoice and reason.
    CreditNote(InvoiceSubType, OriginalInvoiceRef, String),
    /// Original invoice and reason.
    DebitNote(InvoiceSubType, OriginalInvoiceRef, String),
}

impl InvoiceType {
    pub fn sub_type(&self) -> InvoiceSubType {
        match self {
            InvoiceType::Tax(sub)
            | InvoiceType::Prepayment(sub)
            | InvoiceType::CreditNote(sub, ..)
            | InvoiceType::DebitNote(sub, ..) => *sub,
        }
    }

    pub fn is_simplified(&self) -> bool {
        self.sub_type() == InvoiceSubType::Simplified
    }

    /// UN/CEFACT 1001 document code.
    pub fn type_code(&self) -> &'static str {
        match self {
            InvoiceType::Tax(_) => "388",
            InvoiceType::Prepayment(_) => "386",
            InvoiceType::CreditNote(..) => "381",
            InvoiceType::DebitNote(..) => "383",
        }
    }

    /// Credit notes render under the `CreditNote` root element.
    pub fn is_credit_note(&self) -> bool {
        matches!(self, InvoiceType::CreditNote(..))
    }

    pub fn original_invoice(&self) -> Option<&OriginalInvoiceRef> {
        match self {
            InvoiceType::CreditNote(_, original, _) | InvoiceType::DebitNote(_, original, _) => {
                Some(original)
            }
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            InvoiceType::CreditNote(_, _, reason) | InvoiceType::DebitNote(_, _, reason) => {
                Some(reason)
            }
            _ => None,
        }
    }
}

/// UN/ECE 5305 VAT category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VatCategory {
    Exempt,
    Standard,
    Zero,
    OutOfScope,
}

impl VatCategory {
    pub fn code(&self) -> &'static str {
        match self {
            VatCategory::Exempt => "E",
            VatCategory::Standard => "S",
            VatCategory::Zero => "Z",
            VatCategory::OutOfScope => "O",
        }
    }
}

/// Exemption reason attached to non-standard VAT categories (e.g. `VATEX-SA-29`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxExemption {
    pub code: String,
    pub reason: String,
}

/// Single invoice line item.
///
/// Amounts are rounded to two decimals when the item is created, so totals are sums of
/// exactly what gets printed.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::{LineItem, LineItemFields, VatCategory};
///
/// let item = LineItem::new(LineItemFields {
///     description: "Pencil".into(),
///     quantity: 3.0,
///     unit_code: "PCE".into(),
///     unit_price: 1.15,
///     vat_rate: 15.0,
///     vat_category: VatCategory::Standard,
/// });
/// assert_eq!(item.total_amount(), 3.45);
/// assert_eq!(item.vat_amount(), 0.52);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    description: String,
    quantity: f64,
    unit_code: String,
    unit_price: f64,
    total_amount: f64,
    vat_rate: f64,
    vat_amount: f64,
    vat_category: VatCategory,
    exemption: Option<TaxExemption>,
}

/// Fields for a line item whose totals are computed.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemFields {
    pub description: String,
    pub quantity: f64,
    pub unit_code: String,
    pub unit_price: f64,
    pub vat_rate: f64,
    pub vat_category: VatCategory,
}

/// Fields for a line item with a caller-provided net total.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemTotalsFields {
    pub description: String,
    pub quantity: f64,
    pub unit_code: String,
    pub unit_price: f64,
    pub total_amount: f64,
    pub vat_rate: f64,
    pub vat_category: VatCategory,
}

impl LineItem {
    pub fn new(fields: LineItemFields) -> Self {
        let total_amount = round2(fields.quantity * fields.unit_price);
        Self::from_totals(LineItemTotalsFields {
            description: fields.description,
            quantity: fields.quantity,
            unit_code: fields.unit_code,
            unit_price: fields.unit_price,
            total_amount,
            vat_rate: fields.vat_rate,
            vat_category: fields.vat_category,
        })
    }

    pub fn from_totals(fields: LineItemTotalsFields) -> Self {
        let total_amount = round2(fields.total_amount);
        Self {
            description: fields.description,
            quantity: fields.quantity,
            unit_code: fields.unit_code,
            unit_price: fields.unit_price,
            total_amount,
            vat_rate: fields.vat_rate,
            vat_amount: round2(total_amount * fields.vat_rate / 100.0),
            vat_category: fields.vat_category,
            exemption: None,
        }
    }

    pub fn with_exemption(mut self, code: impl Into<String>, reason: impl Into<String>) -> Self {
        self.exemption = Some(TaxExemption {
            code: code.into(),
            reason: reason.into(),
        });
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn unit_code(&self) -> &str {
        &self.unit_code
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }

    pub fn total_amount(&self) -> f64 {
        self.total_amount
    }

    pub fn vat_rate(&self) -> f64 {
        self.vat_rate
    }

    pub fn vat_amount(&self) -> f64 {
        self.vat_amount
    }

    pub fn vat_category(&self) -> VatCategory {
        self.vat_category
    }

    pub fn exemption(&self) -> Option<&TaxExemption> {
        self.exemption.as_ref()
    }

    pub(crate) fn check(&self, index: usize) -> Result<()> {
        let invalid = |reason: &str| InvoiceError::InvalidLineItem {
            index,
            reason: reason.to_string(),
        };
        if self.description.trim().is_empty() {
            return Err(invalid("description is empty"));
        }
        if self.unit_code.trim().is_empty() {
            return Err(invalid("unit code is empty"));
        }
        if !(self.quantity.is_finite() && self.quantity > 0.0) {
            return Err(invalid("quantity must be positive"));
        }
        if !(self.unit_price.is_finite() && self.unit_price >= 0.0) {
            return Err(invalid("unit price must not be negative"));
        }
        if !(0.0..=100.0).contains(&self.vat_rate) {
            return Err(invalid("VAT rate must be between 0 and 100"));
        }
        match self.vat_category {
            VatCategory::Standard if self.vat_rate <= 0.0 => {
                Err(invalid("standard-rated items need a positive VAT rate"))
            }
            VatCategory::Standard => Ok(()),
            _ if self.vat_rate != 0.0 => Err(invalid("only standard-rated items carry VAT")),
            _ => Ok(()),
        }
    }
}

pub type LineItems = Vec<LineItem>;

bitflags! {
    /// Transaction flags encoded in the `name` attribute of the type code.
    ///
    /// # Examples
    /// ```rust
    /// use zatca_core::invoice::{InvoiceFlags, InvoiceSubType};
    ///
    /// let flags = InvoiceFlags::EXPORT | InvoiceFlags::SELF_BILLED;
    /// assert_eq!(flags.type_code_name(InvoiceSubType::Standard), "0100101");
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InvoiceFlags: u8 {
        const THIRD_PARTY = 0b00001;
        const NOMINAL = 0b00010;
        const EXPORT = 0b00100;
        const SUMMARY = 0b01000;
        const SELF_BILLED = 0b10000;
    }
}

impl InvoiceFlags {
    /// Seven-character transaction code: `01`/`02` then one digit per flag.
    pub fn type_code_name(&self, sub_type: InvoiceSubType) -> String {
        let mut name = String::from(match sub_type {
            InvoiceSubType::Standard => "01",
            InvoiceSubType::Simplified => "02",
        });
        for flag in [
            InvoiceFlags::THIRD_PARTY,
            InvoiceFlags::NOMINAL,
            InvoiceFlags::EXPORT,
            InvoiceFlags::SUMMARY,
            InvoiceFlags::SELF_BILLED,
        ] {
            name.push(if self.contains(flag) { '1' } else { '0' });
        }
        name
    }
}

/// Core invoice data, produced by [`InvoiceBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    invoice_type: InvoiceType,
    id: String,
    uuid: String,
    issue_datetime: DateTime<Utc>,
    currency: Currency,
    previous_invoice_hash: String,
    invoice_counter: u64,
    note: Option<InvoiceNote>,
    seller: Seller,
    buyer: Option<Buyer>,
    line_items: LineItems,
    payment_means_code: String,
    flags: InvoiceFlags,
}

impl InvoiceData {
    pub fn invoice_type(&self) -> &InvoiceType {
        &self.invoice_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn issue_datetime(&self) -> &DateTime<Utc> {
        &self.issue_datetime
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn previous_invoice_hash(&self) -> &str {
        &self.previous_invoice_hash
    }

    pub fn invoice_counter(&self) -> u64 {
        self.invoice_counter
    }

    pub fn note(&self) -> Option<&InvoiceNote> {
        self.note.as_ref()
    }

    pub fn seller(&self) -> &Seller {
        &self.seller
    }

    pub fn buyer(&self) -> Option<&Buyer> {
        self.buyer.as_ref()
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn payment_means_code(&self) -> &str {
        &self.payment_means_code
    }

    pub fn flags(&self) -> InvoiceFlags {
        self.flags
    }

    /// Value of the `name` attribute on the type code element.
    pub fn type_code_name(&self) -> String {
        self.flags.type_code_name(self.invoice_type.sub_type())
    }

    pub fn issue_date_string(&self) -> String {
        self.issue_datetime.format("%Y-%m-%d").to_string()
    }

    pub fn issue_time_string(&self) -> String {
        self.issue_datetime.format("%H:%M:%S").to_string()
    }

    /// XAdES signing time and QR timestamp: issue date and time in UTC.
    pub fn signing_time(&self) -> String {
        self.issue_datetime.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("id", &self.id),
            ("uuid", &self.uuid),
            ("payment means code", &self.payment_means_code),
        ] {
            if value.trim().is_empty() {
                return Err(InvoiceError::EmptyField { field });
            }
        }
        if self.invoice_counter == 0 {
            return Err(InvoiceError::InvalidInvoiceCounter);
        }
        use base64ct::{Base64, Encoding};
        match Base64::decode_vec(self.previous_invoice_hash.trim()) {
            Ok(bytes) if !bytes.is_empty() => {}
            _ => return Err(InvoiceError::InvalidPreviousInvoiceHash),
        }
        if self.invoice_type.sub_type() == InvoiceSubType::Standard && self.buyer.is_none() {
            return Err(InvoiceError::MissingBuyer);
        }
        if self.line_items.is_empty() {
            return Err(InvoiceError::MissingLineItems);
        }
        self.line_items
            .iter()
            .enumerate()
            .try_for_each(|(index, item)| item.check(index))
    }
}

/// Document-level totals, summed from the rounded line amounts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTotalsData {
    line_extension: f64,
    tax_amount: f64,
}

impl InvoiceTotalsData {
    pub(crate) fn from_items(items: &[LineItem]) -> Self {
        Self {
            line_extension: round2(items.iter().map(LineItem::total_amount).sum()),
            tax_amount: round2(items.iter().map(LineItem::vat_amount).sum()),
        }
    }

    pub fn line_extension(&self) -> f64 {
        self.line_extension
    }

    pub fn tax_amount(&self) -> f64 {
        self.tax_amount
    }

    pub fn tax_exclusive_amount(&self) -> f64 {
        self.line_extension
    }

    pub fn tax_inclusive_amount(&self) -> f64 {
        round2(self.line_extension + self.tax_amount)
    }
}

/// One `cac:TaxSubtotal`: every line sharing a category and rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VatBreakdown {
    pub category: VatCategory,
    pub rate: f64,
    pub taxable_amount: f64,
    pub tax_amount: f64,
    pub exemption: Option<TaxExemption>,
}

/// Group line items by VAT category and rate, keeping the order in which groups first appear.
///
/// # Examples
/// ```rust
/// use zatca_core::invoice::{vat_breakdown, LineItem, LineItemFields, VatCategory};
///
/// let item = |price: f64, rate: f64, category| LineItem::new(LineItemFields {
///     description: "x".into(),
///     quantity: 1.0,
///     unit_code: "PCE".into(),
///     unit_price: price,
///     vat_rate: rate,
///     vat_category: category,
/// });
/// let groups = vat_breakdown(&[
///     item(10.0, 15.0, VatCategory::Standard),
///     item(5.0, 0.0, VatCategory::Zero),
///     item(20.0, 15.0, VatCategory::Standard),
/// ]);
/// assert_eq!(groups.len(), 2);
/// assert_eq!(groups[0].taxable_amount, 30.0);
/// assert_eq!(groups[1].category, VatCategory::Zero);
/// ```
pub fn vat_breakdown(items: &[LineItem]) -> Vec<VatBreakdown> {
    let mut groups: Vec<(i64, VatBreakdown)> = Vec::new();
    for item in items {
        // Rates compare in hundredths of a percent so 15 and 15.0000001 do not split a group.
        let rate_key = (item.vat_rate * 100.0).round() as i64;
        match groups
            .iter_mut()
            .find(|(key, group)| *key == rate_key && group.category == item.vat_category)
        {
            Some((_, group)) => {
                group.taxable_amount = round2(group.taxable_amount + item.total_amount);
                group.tax_amount = round2(group.tax_amount + item.vat_amount);
                if group.exemption.is_none() {
                    group.exemption = item.exemption.clone();
                }
            }
            None => groups.push((
                rate_key,
                VatBreakdown {
                    category: item.vat_category,
                    rate: item.vat_rate,
                    taxable_amount: item.total_amount,
                    tax_amount: item.vat_amount,
                    exemption: item.exemption.clone(),
                },
            )),
        }
    }
    groups.into_iter().map(|(_, group)| group).collect()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}
