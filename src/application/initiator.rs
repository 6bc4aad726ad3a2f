use crate::domain::payment::{PaymentMethod, PaymentRecord, PaymentRequest, PaymentStatus};
use crate::domain::ports::PaymentGatewayRef;
use crate::error::{GatewayError, PaymentError, Result};
use tracing::{info, warn};

/// Result of a successful initiation.
#[derive(Debug, Clone, PartialEq)]
pub enum Initiation {
    /// Card flow: the caller navigates to `redirect_url` and nothing is polled.
    Redirect {
        record: PaymentRecord,
        redirect_url: String,
    },
    /// Mobile-money flow: the payer confirms on their phone and the caller
    /// polls `record.id` until it settles.
    AwaitingConfirmation { record: PaymentRecord },
}

impl Initiation {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            Initiation::Redirect { record, .. } => record,
            Initiation::AwaitingConfirmation { record } => record,
        }
    }

    pub fn redirect_url(&self) -> Option<&str> {
        match self {
            Initiation::Redirect { redirect_url, .. } => Some(redirect_url),
            Initiation::AwaitingConfirmation { .. } => None,
        }
    }
}

/// Submits payment requests to a gateway.
///
/// Makes exactly one gateway call per request and never retries; whether to
/// try again after a `GatewayError` is the caller's decision.
pub struct PaymentInitiator {
    gateway: PaymentGatewayRef,
}

impl PaymentInitiator {
    pub fn new(gateway: PaymentGatewayRef) -> Self {
        Self { gateway }
    }

    pub async fn initiate(&self, request: &PaymentRequest) -> Result<Initiation> {
        request.validate()?;

        let response = self.gateway.create_payment(request).await.map_err(|e| {
            warn!(order = %request.order_reference, error = %e, "payment initiation failed");
            PaymentError::from(e)
        })?;

        let record = response.record;
        let initiation = match request.method {
            PaymentMethod::Card => {
                let redirect_url = response
                    .redirect_url
                    .or_else(|| record.redirect_url.clone())
                    .filter(|url| !url.trim().is_empty())
                    .ok_or_else(|| {
                        GatewayError::MalformedResponse(format!(
                            "card payment {} returned without a redirect URL",
                            record.id
                        ))
                    })?;
                Initiation::Redirect {
                    record,
                    redirect_url,
                }
            }
            PaymentMethod::MobileMoney => {
                if record.status != PaymentStatus::Pending {
                    return Err(GatewayError::MalformedResponse(format!(
                        "mobile-money payment {} created in status {}",
                        record.id, record.status
                    ))
                    .into());
                }
                if response.redirect_url.is_some() || record.redirect_url.is_some() {
                    return Err(GatewayError::MalformedResponse(format!(
                        "mobile-money payment {} returned a redirect URL",
                        record.id
                    ))
                    .into());
                }
                Initiation::AwaitingConfirmation { record }
            }
        };

        info!(
            payment_id = %initiation.record().id,
            order = %request.order_reference,
            method = %request.method,
            "payment initiated"
        );
        Ok(initiation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Amount, Currency};
    use crate::domain::ports::{GatewayInitiation, PaymentGateway};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every create call with a fixed response.
    struct FixedGateway {
        redirect_url: Option<String>,
        status: PaymentStatus,
        calls: AtomicUsize,
    }

    impl FixedGateway {
        fn new(redirect_url: Option<&str>, status: PaymentStatus) -> Arc<Self> {
            Arc::new(Self {
                redirect_url: redirect_url.map(String::from),
                status,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PaymentGateway for FixedGateway {
        async fn create_payment(
            &self,
            request: &PaymentRequest,
        ) -> std::result::Result<GatewayInitiation, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = Utc::now();
            Ok(GatewayInitiation {
                record: PaymentRecord {
                    id: "pay_1".to_string(),
                    order_reference: request.order_reference.clone(),
                    amount: Amount::new(request.amount).unwrap(),
                    currency: request.currency,
                    method: request.method,
                    status: self.status,
                    gateway_reference: None,
                    redirect_url: None,
                    created_at: now,
                    updated_at: now,
                },
                redirect_url: self.redirect_url.clone(),
            })
        }

        async fn get_payment_status(
            &self,
            payment_id: &str,
        ) -> std::result::Result<PaymentRecord, GatewayError> {
            Err(GatewayError::NotFound(payment_id.to_string()))
        }

        async fn get_order_payments(
            &self,
            _order_reference: &str,
        ) -> std::result::Result<Vec<PaymentRecord>, GatewayError> {
            Ok(Vec::new())
        }
    }

    fn request(method: PaymentMethod, contact: &str) -> PaymentRequest {
        PaymentRequest {
            order_reference: "ORD-7".to_string(),
            amount: dec!(250.00),
            currency: Currency::Kes,
            method,
            payer_contact: contact.to_string(),
        }
    }

    #[tokio::test]
    async fn test_card_without_redirect_is_malformed() {
        let gateway = FixedGateway::new(None, PaymentStatus::Pending);
        let initiator = PaymentInitiator::new(gateway.clone());

        let result = initiator
            .initiate(&request(PaymentMethod::Card, "buyer@example.com"))
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::GatewayError(GatewayError::MalformedResponse(_)))
        ));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mobile_money_with_redirect_is_malformed() {
        let gateway = FixedGateway::new(Some("https://pay.example/x"), PaymentStatus::Pending);
        let initiator = PaymentInitiator::new(gateway);

        let result = initiator
            .initiate(&request(PaymentMethod::MobileMoney, "0712345678"))
            .await;

        assert!(matches!(
            result,
            Err(PaymentError::GatewayError(GatewayError::MalformedResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_gateway() {
        let gateway = FixedGateway::new(None, PaymentStatus::Pending);
        let initiator = PaymentInitiator::new(gateway.clone());

        let mut bad = request(PaymentMethod::MobileMoney, "0712345678");
        bad.amount = dec!(0);

        let result = initiator.initiate(&bad).await;
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }
}
