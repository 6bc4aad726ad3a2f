use crate::config::{SandboxBehavior, SandboxConfig};
use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentRequest, PaymentStatus};
use crate::domain::ports::{GatewayInitiation, PaymentGateway, PaymentStoreBox};
use crate::error::{GatewayError, PaymentError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Result reported by the mobile-money network or the hosted card page.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CallbackResult {
    Succeeded { transaction_id: Option<String> },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentCallback {
    pub payment_id: String,
    #[serde(flatten)]
    pub result: CallbackResult,
}

/// Gateway adapter that simulates the mobile-money push and hosted card
/// checkout integrations on top of a `PaymentStore`.
///
/// Mobile-money payments advance on each status read: `processing` after the
/// first read, settled after `confirm_after` reads. Card payments only move
/// when a callback arrives.
pub struct SandboxGateway {
    store: PaymentStoreBox,
    config: SandboxConfig,
    reads: Mutex<HashMap<String, u32>>,
}

impl SandboxGateway {
    pub fn new(store: PaymentStoreBox, config: SandboxConfig) -> Self {
        Self {
            store,
            config,
            reads: Mutex::new(HashMap::new()),
        }
    }

    async fn load(&self, payment_id: &str) -> std::result::Result<PaymentRecord, GatewayError> {
        self.store
            .get(payment_id)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| GatewayError::NotFound(payment_id.to_string()))
    }

    /// Applies an externally reported result to the stored record.
    ///
    /// Replaying the current status is a no-op; a callback that would move
    /// the record backwards is rejected and leaves it untouched.
    pub async fn handle_callback(&self, callback: PaymentCallback) -> Result<PaymentRecord> {
        let mut reads = self.reads.lock().await;
        let mut record = self.load(&callback.payment_id).await?;

        let next = match &callback.result {
            CallbackResult::Succeeded { .. } => PaymentStatus::Completed,
            CallbackResult::Failed { .. } => PaymentStatus::Failed,
        };

        let changed = record.advance(next, Utc::now()).inspect_err(|e| {
            warn!(payment_id = %callback.payment_id, error = %e, "callback rejected");
        })?;
        if changed {
            if let CallbackResult::Succeeded {
                transaction_id: Some(txn),
            } = &callback.result
            {
                record.gateway_reference = Some(txn.clone());
            }
            self.store.store(record.clone()).await?;
            reads.remove(&record.id);
            info!(payment_id = %record.id, status = %record.status, "callback applied");
        }
        Ok(record)
    }

    /// Refunds a payment that is still `processing`.
    pub async fn refund(&self, payment_id: &str) -> Result<PaymentRecord> {
        let mut reads = self.reads.lock().await;
        let mut record = self.load(payment_id).await?;
        if record.advance(PaymentStatus::Refunded, Utc::now())? {
            self.store.store(record.clone()).await?;
            reads.remove(payment_id);
            info!(payment_id, "payment refunded");
        }
        Ok(record)
    }

    fn settled_status(&self) -> PaymentStatus {
        match self.config.behavior {
            SandboxBehavior::Decline => PaymentStatus::Failed,
            SandboxBehavior::NeverConfirm => PaymentStatus::Processing,
            SandboxBehavior::Approve | SandboxBehavior::Unavailable => PaymentStatus::Completed,
        }
    }

    fn unavailable(&self) -> std::result::Result<(), GatewayError> {
        if self.config.behavior == SandboxBehavior::Unavailable {
            return Err(GatewayError::Transport(
                "sandbox gateway configured as unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn storage_error(e: PaymentError) -> GatewayError {
    GatewayError::Storage(e.to_string())
}

fn token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> std::result::Result<GatewayInitiation, GatewayError> {
        self.unavailable()?;

        let amount = request.validate().map_err(|e| GatewayError::Rejected {
            code: "INVALID_REQUEST".to_string(),
            message: e.to_string(),
        })?;

        let (gateway_reference, redirect_url) = match request.method {
            PaymentMethod::MobileMoney => (format!("ws_CO_{}", token()), None),
            PaymentMethod::Card => {
                let intent = format!("pi_mock_{}", token());
                let url = format!(
                    "{}/{}?client_secret={}_secret_{}",
                    self.config.checkout_base_url.trim_end_matches('/'),
                    intent,
                    intent,
                    token()
                );
                (intent, Some(url))
            }
        };

        let now = Utc::now();
        let record = PaymentRecord {
            id: format!("pay_{}", token()),
            order_reference: request.order_reference.clone(),
            amount,
            currency: request.currency,
            method: request.method,
            status: PaymentStatus::Pending,
            gateway_reference: Some(gateway_reference),
            redirect_url: redirect_url.clone(),
            created_at: now,
            updated_at: now,
        };
        self.store
            .store(record.clone())
            .await
            .map_err(storage_error)?;

        Ok(GatewayInitiation {
            record,
            redirect_url,
        })
    }

    async fn get_payment_status(
        &self,
        payment_id: &str,
    ) -> std::result::Result<PaymentRecord, GatewayError> {
        self.unavailable()?;

        let mut reads = self.reads.lock().await;
        let mut record = self.load(payment_id).await?;
        if record.method != PaymentMethod::MobileMoney || record.is_terminal() {
            return Ok(record);
        }

        let count = reads.entry(payment_id.to_string()).or_insert(0);
        *count += 1;
        let next = if *count >= self.config.confirm_after {
            self.settled_status()
        } else {
            PaymentStatus::Processing
        };
        if next.is_terminal() {
            reads.remove(payment_id);
        }

        let changed = record
            .advance(next, Utc::now())
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;
        if changed {
            self.store
                .store(record.clone())
                .await
                .map_err(storage_error)?;
        }
        Ok(record)
    }

    async fn get_order_payments(
        &self,
        order_reference: &str,
    ) -> std::result::Result<Vec<PaymentRecord>, GatewayError> {
        self.unavailable()?;
        self.store
            .find_by_order(order_reference)
            .await
            .map_err(storage_error)
    }
}
