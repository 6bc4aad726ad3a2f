use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentGatewayRef;
use crate::error::{PaymentError, Result};
use std::time::Duration;
use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// Bounds for one poll session. Whichever of `max_attempts` or `timeout` is
/// reached first ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub max_attempts: u32,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Polls a gateway until a payment reaches a terminal status.
///
/// Each call to [`StatusPoller::poll`] is an independent session with its own
/// attempt counter and deadline, so several payments can be polled
/// concurrently. Within a session fetches are strictly sequential.
pub struct StatusPoller {
    gateway: PaymentGatewayRef,
    options: PollOptions,
}

impl StatusPoller {
    pub fn new(gateway: PaymentGatewayRef, options: PollOptions) -> Self {
        Self { gateway, options }
    }

    pub async fn poll(
        &self,
        payment_id: &str,
        cancel: &CancellationToken,
    ) -> Result<PaymentRecord> {
        self.poll_with(payment_id, self.options, cancel).await
    }

    /// Runs one poll session with explicit bounds.
    ///
    /// Fetch errors, and answers for a different payment id, use up an
    /// attempt but do not end the session. Cancellation
    /// is checked before every fetch and during every wait; a fetch already in
    /// flight when the token fires is allowed to finish and its result is
    /// discarded.
    pub async fn poll_with(
        &self,
        payment_id: &str,
        options: PollOptions,
        cancel: &CancellationToken,
    ) -> Result<PaymentRecord> {
        let max_attempts = options.max_attempts.max(1);
        let deadline = Instant::now() + options.timeout;
        let mut last: Option<PaymentRecord> = None;
        let mut attempts = 0;

        while attempts < max_attempts {
            if cancel.is_cancelled() {
                debug!(payment_id, attempts, "poll cancelled");
                return Err(PaymentError::Cancelled);
            }

            attempts += 1;
            let fetched =
                match timeout_at(deadline, self.gateway.get_payment_status(payment_id)).await {
                    Ok(fetched) => fetched,
                    Err(_) => {
                        warn!(payment_id, attempt = attempts, "poll deadline reached mid-fetch");
                        break;
                    }
                };

            if cancel.is_cancelled() {
                debug!(payment_id, attempt = attempts, "discarding fetch after cancellation");
                return Err(PaymentError::Cancelled);
            }

            match fetched {
                Ok(record) if record.id != payment_id => {
                    warn!(
                        payment_id,
                        attempt = attempts,
                        returned = %record.id,
                        "gateway answered for a different payment"
                    );
                }
                Ok(record) => {
                    if let Some(prev) = &last
                        && !prev.status.can_advance_to(record.status)
                    {
                        return Err(PaymentError::StatusRegression {
                            payment_id: payment_id.to_string(),
                            from: prev.status,
                            to: record.status,
                        });
                    }

                    debug!(
                        payment_id,
                        attempt = attempts,
                        status = %record.status,
                        "polled payment"
                    );
                    if record.is_terminal() {
                        info!(payment_id, attempts, status = %record.status, "payment settled");
                        return Ok(record);
                    }
                    last = Some(record);
                }
                Err(e) => {
                    warn!(payment_id, attempt = attempts, error = %e, "status fetch failed");
                }
            }

            if attempts < max_attempts {
                let wake = (Instant::now() + options.interval).min(deadline);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!(payment_id, attempts, "poll cancelled while waiting");
                        return Err(PaymentError::Cancelled);
                    }
                    _ = sleep_until(wake) => {}
                }
                if Instant::now() >= deadline {
                    warn!(payment_id, attempts, "poll deadline reached");
                    break;
                }
            }
        }

        warn!(payment_id, attempts, "payment still unsettled after polling");
        Err(PaymentError::PollTimeout {
            payment_id: payment_id.to_string(),
            attempts,
            last_record: last.map(Box::new),
        })
    }
}
