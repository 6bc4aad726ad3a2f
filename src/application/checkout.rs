use super::initiator::{Initiation, PaymentInitiator};
use super::poller::{PollOptions, StatusPoller};
use crate::domain::notice::{Notice, PaymentNotice};
use crate::domain::payment::{PaymentRecord, PaymentRequest, PaymentStatus};
use crate::domain::ports::{PaymentGatewayRef, PaymentNotifier, PaymentNotifierRef};
use crate::error::{PaymentError, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How a checkout ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// Card payment handed off to a hosted page; nothing was polled.
    Redirect {
        record: PaymentRecord,
        redirect_url: String,
    },
    /// Mobile-money payment reached a terminal status.
    Settled(PaymentRecord),
}

impl PaymentOutcome {
    pub fn record(&self) -> &PaymentRecord {
        match self {
            PaymentOutcome::Redirect { record, .. } => record,
            PaymentOutcome::Settled(record) => record,
        }
    }
}

/// Drives one payment from request to outcome and tells the caller what to
/// show at each step.
///
/// Built from explicitly passed collaborators; it holds no global state.
pub struct CheckoutFlow {
    initiator: PaymentInitiator,
    poller: StatusPoller,
    gateway: PaymentGatewayRef,
    notifier: PaymentNotifierRef,
}

impl CheckoutFlow {
    pub fn new(
        gateway: PaymentGatewayRef,
        notifier: PaymentNotifierRef,
        options: PollOptions,
    ) -> Self {
        Self {
            initiator: PaymentInitiator::new(gateway.clone()),
            poller: StatusPoller::new(gateway.clone(), options),
            gateway,
            notifier,
        }
    }

    pub fn initiator(&self) -> &PaymentInitiator {
        &self.initiator
    }

    pub async fn pay(
        &self,
        request: &PaymentRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentOutcome> {
        let result = self.run(request, cancel).await;
        if let Err(e) = &result {
            self.report_error(Some(&request.order_reference), None, e);
        }
        result
    }

    async fn run(
        &self,
        request: &PaymentRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentOutcome> {
        // A cancelled session must not push a prompt to the payer's phone.
        if cancel.is_cancelled() {
            return Err(PaymentError::Cancelled);
        }

        match self.initiator.initiate(request).await? {
            Initiation::Redirect {
                record,
                redirect_url,
            } => {
                self.send(
                    &record,
                    Notice::Redirecting,
                    format!("Redirecting to {}", redirect_url),
                );
                Ok(PaymentOutcome::Redirect {
                    record,
                    redirect_url,
                })
            }
            Initiation::AwaitingConfirmation { record } => {
                self.send(
                    &record,
                    Notice::CheckPhone,
                    "Please complete the payment on your phone".to_string(),
                );
                let settled = self.poller.poll(&record.id, cancel).await?;
                self.report_status(&settled);
                Ok(PaymentOutcome::Settled(settled))
            }
        }
    }

    /// Reads the current status once, without polling.
    pub async fn verify(&self, payment_id: &str) -> Result<PaymentRecord> {
        match self.gateway.get_payment_status(payment_id).await {
            Ok(record) => {
                info!(payment_id, status = %record.status, "payment verified");
                self.report_status(&record);
                Ok(record)
            }
            Err(e) => {
                let error = PaymentError::from(e);
                self.report_error(None, Some(payment_id), &error);
                Err(error)
            }
        }
    }

    /// Every payment the gateway holds for an order, newest first.
    pub async fn order_payments(&self, order_reference: &str) -> Result<Vec<PaymentRecord>> {
        let payments = self
            .gateway
            .get_order_payments(order_reference)
            .await
            .inspect_err(|e| {
                warn!(order = %order_reference, error = %e, "order payment lookup failed");
            })?;
        Ok(payments)
    }

    fn report_status(&self, record: &PaymentRecord) {
        match record.status {
            PaymentStatus::Completed => self.send(
                record,
                Notice::Succeeded,
                "Payment completed successfully".to_string(),
            ),
            PaymentStatus::Failed => {
                self.send(record, Notice::Declined, "Payment failed".to_string())
            }
            PaymentStatus::Refunded => {
                self.send(record, Notice::Declined, "Payment was refunded".to_string())
            }
            PaymentStatus::Pending | PaymentStatus::Processing => {}
        }
    }

    fn report_error(
        &self,
        order_reference: Option<&str>,
        payment_id: Option<&str>,
        error: &PaymentError,
    ) {
        let notice = error.notice();
        if notice.is_silent() {
            return;
        }
        warn!(
            order = order_reference.unwrap_or("-"),
            payment_id = payment_id.unwrap_or("-"),
            kind = error.kind(),
            error = %error,
            "checkout failed"
        );

        let payment_id = match error {
            PaymentError::PollTimeout { payment_id, .. }
            | PaymentError::StatusRegression { payment_id, .. } => Some(payment_id.clone()),
            _ => payment_id.map(String::from),
        };
        let message = match notice {
            Notice::CheckOrderHistory => {
                "Payment is still being confirmed; check your order history shortly".to_string()
            }
            Notice::ContactSupport => format!("{}; please contact support", error),
            _ => error.to_string(),
        };
        self.notifier.notify(PaymentNotice {
            order_reference: order_reference.map(String::from),
            payment_id,
            notice,
            message,
        });
    }

    fn send(&self, record: &PaymentRecord, notice: Notice, message: String) {
        self.notifier.notify(PaymentNotice {
            order_reference: Some(record.order_reference.clone()),
            payment_id: Some(record.id.clone()),
            notice,
            message,
        });
    }
}

/// Writes notices to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl PaymentNotifier for TracingNotifier {
    fn notify(&self, notice: PaymentNotice) {
        info!(
            order = notice.order_reference.as_deref().unwrap_or("-"),
            payment_id = notice.payment_id.as_deref().unwrap_or("-"),
            notice = ?notice.notice,
            "{}",
            notice.message
        );
    }
}
