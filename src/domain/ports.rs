use super::notice::PaymentNotice;
use super::payment::{PaymentRecord, PaymentRequest};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// What a gateway hands back when a payment is created.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayInitiation {
    pub record: PaymentRecord,
    pub redirect_url: Option<String>,
}

/// Boundary to whatever actually moves money.
///
/// Adapters own protocol detail (request signing, webhook verification) and
/// normalize every response into a `PaymentRecord`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> std::result::Result<GatewayInitiation, GatewayError>;

    async fn get_payment_status(
        &self,
        payment_id: &str,
    ) -> std::result::Result<PaymentRecord, GatewayError>;

    /// All payments created for `order_reference`, newest first.
    async fn get_order_payments(
        &self,
        order_reference: &str,
    ) -> std::result::Result<Vec<PaymentRecord>, GatewayError>;
}

/// System-of-record storage for payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn store(&self, record: PaymentRecord) -> Result<()>;
    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>>;
    /// Records for one order, newest first.
    async fn find_by_order(&self, order_reference: &str) -> Result<Vec<PaymentRecord>>;
}

/// Receives the notices a checkout flow emits.
pub trait PaymentNotifier: Send + Sync {
    fn notify(&self, notice: PaymentNotice);
}

pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type PaymentNotifierRef = Arc<dyn PaymentNotifier>;
