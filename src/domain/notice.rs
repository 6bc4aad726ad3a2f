use serde::Serialize;

/// What the caller should show the payer.
///
/// The copy and styling are the caller's business; this only says which kind
/// of message applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// Ask the payer to approve the push prompt on their phone.
    CheckPhone,
    /// The payer is being handed off to a hosted checkout page.
    Redirecting,
    Succeeded,
    Declined,
    /// Block progress until the request is corrected or retried.
    RetryPrompt,
    /// Outcome unknown for now; point the payer at their order history.
    CheckOrderHistory,
    ContactSupport,
    Silent,
}

impl Notice {
    pub fn is_silent(self) -> bool {
        self == Notice::Silent
    }
}

/// One notification emitted by a checkout flow.
///
/// `order_reference` is unknown when a payment is looked up by id alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentNotice {
    pub order_reference: Option<String>,
    pub payment_id: Option<String>,
    pub notice: Notice,
    pub message: String,
}
