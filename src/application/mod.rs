//! Application layer: the payment workflow built on top of the domain ports.
//!
//! `PaymentInitiator` submits requests, `StatusPoller` waits for mobile-money
//! payments to settle, and `CheckoutFlow` ties both to caller notifications.
//! `SubscriptionIntents` reuses the initiator for vendor plan purchases.

pub mod checkout;
pub mod initiator;
pub mod poller;
pub mod subscription;
