use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places both supported currencies settle in.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// A strictly positive monetary amount.
///
/// Wraps `rust_decimal::Decimal` so that an amount which reached a gateway
/// can never be zero, negative, or carry sub-cent precision. Deserializing
/// applies the same checks.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        if value.normalize().scale() > MINOR_UNIT_SCALE {
            return Err(PaymentError::ValidationError(format!(
                "Amount {} has more than {} decimal places",
                value, MINOR_UNIT_SCALE
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Kes,
    Usd,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Kes => write!(f, "KES"),
            Currency::Usd => write!(f, "USD"),
        }
    }
}

/// How the payer settles: a mobile-money push to their phone, or a hosted
/// card checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[serde(alias = "mpesa")]
    MobileMoney,
    #[serde(alias = "stripe")]
    Card,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::MobileMoney => write!(f, "mobile_money"),
            PaymentMethod::Card => write!(f, "card"),
        }
    }
}

/// A payment the caller wants to make for an order.
///
/// Handed to the initiator by reference; nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_reference: String,
    pub amount: Decimal,
    #[serde(default)]
    pub currency: Currency,
    pub method: PaymentMethod,
    pub payer_contact: String,
}

impl PaymentRequest {
    /// Checks every caller-side constraint and returns the validated amount.
    ///
    /// Nothing is trimmed or rounded: a request that needs fixing is rejected.
    pub fn validate(&self) -> Result<Amount> {
        if self.order_reference.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Order reference must not be empty".to_string(),
            ));
        }

        let amount = Amount::new(self.amount)?;

        if self.payer_contact.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Payer contact must not be empty".to_string(),
            ));
        }

        if self.method == PaymentMethod::MobileMoney && !is_phone_number(&self.payer_contact) {
            return Err(PaymentError::ValidationError(format!(
                "'{}' is not a valid mobile-money phone number",
                self.payer_contact
            )));
        }

        Ok(amount)
    }
}

/// Accepts an optional leading `+` followed by 9 to 15 digits, with spaces
/// allowed as visual separators.
fn is_phone_number(contact: &str) -> bool {
    let digits = contact.strip_prefix('+').unwrap_or(contact);
    let mut count = 0;
    for c in digits.chars() {
        match c {
            '0'..='9' => count += 1,
            ' ' => {}
            _ => return false,
        }
    }
    (9..=15).contains(&count)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded
        )
    }

    fn stage(self) -> u8 {
        match self {
            PaymentStatus::Pending => 0,
            PaymentStatus::Processing => 1,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded => 2,
        }
    }

    /// Whether a record currently in `self` may next be observed in `next`.
    ///
    /// Status only moves forward. Observing the same status again is allowed,
    /// a terminal status never changes, and `refunded` is only reachable from
    /// `processing`.
    pub fn can_advance_to(self, next: PaymentStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            PaymentStatus::Refunded => self == PaymentStatus::Processing,
            _ => next.stage() > self.stage(),
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(s)
    }
}

/// The gateway's view of one payment.
///
/// The gateway is the system of record; the client only ever holds copies
/// returned by `create_payment` or `get_payment_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: String,
    pub order_reference: String,
    pub amount: Amount,
    pub currency: Currency,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub gateway_reference: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the record to `next`, refusing any backward transition.
    ///
    /// Returns `Ok(false)` when `next` is the current status.
    pub fn advance(&mut self, next: PaymentStatus, at: DateTime<Utc>) -> Result<bool> {
        if !self.status.can_advance_to(next) {
            return Err(PaymentError::StatusRegression {
                payment_id: self.id.clone(),
                from: self.status,
                to: next,
            });
        }
        if self.status == next {
            return Ok(false);
        }
        self.status = next;
        self.updated_at = at;
        Ok(true)
    }
}
