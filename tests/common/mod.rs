#![allow(dead_code)]

use async_trait::async_trait;
use bazaar_payments::domain::notice::PaymentNotice;
use bazaar_payments::domain::payment::{
    Amount, Currency, PaymentMethod, PaymentRecord, PaymentRequest, PaymentStatus,
};
use bazaar_payments::domain::ports::{GatewayInitiation, PaymentGateway, PaymentNotifier};
use bazaar_payments::error::GatewayError;
use chrono::Utc;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// What the scripted gateway answers to one status fetch.
#[derive(Debug, Clone)]
pub enum Step {
    Status(PaymentStatus),
    /// A record for some other payment id.
    Foreign(&'static str, PaymentStatus),
    Fail(GatewayError),
}

/// A gateway that replays a fixed script of status answers.
///
/// The last step repeats once the script runs out.
pub struct ScriptedGateway {
    steps: Mutex<VecDeque<Step>>,
    fetches: AtomicUsize,
    creates: AtomicUsize,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    cancel_at: Mutex<Option<(usize, CancellationToken)>>,
}

impl ScriptedGateway {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        assert!(!steps.is_empty(), "script needs at least one step");
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            fetches: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            in_flight: AtomicBool::new(false),
            overlapped: AtomicBool::new(false),
            cancel_at: Mutex::new(None),
        })
    }

    /// Fires `token` while fetch number `fetch` is in flight.
    pub fn cancel_during_fetch(&self, fetch: usize, token: CancellationToken) {
        *self.cancel_at.lock().unwrap() = Some((fetch, token));
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn overlapped(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment(
        &self,
        request: &PaymentRequest,
    ) -> Result<GatewayInitiation, GatewayError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut rec = record("pay_scripted", PaymentStatus::Pending, request.method);
        rec.order_reference = request.order_reference.clone();
        let redirect_url = match request.method {
            PaymentMethod::Card => Some("https://checkout.test/pay/pi_scripted".to_string()),
            PaymentMethod::MobileMoney => None,
        };
        Ok(GatewayInitiation {
            record: rec,
            redirect_url,
        })
    }

    async fn get_payment_status(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        let fetch = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;

        let to_cancel = self
            .cancel_at
            .lock()
            .unwrap()
            .as_ref()
            .filter(|(at, _)| *at == fetch)
            .map(|(_, token)| token.clone());
        if let Some(token) = to_cancel {
            token.cancel();
        }
        tokio::task::yield_now().await;

        let step = self.next_step();
        self.in_flight.store(false, Ordering::SeqCst);
        match step {
            Step::Status(status) => Ok(record(payment_id, status, PaymentMethod::MobileMoney)),
            Step::Foreign(id, status) => Ok(record(id, status, PaymentMethod::MobileMoney)),
            Step::Fail(e) => Err(e),
        }
    }

    async fn get_order_payments(
        &self,
        _order_reference: &str,
    ) -> Result<Vec<PaymentRecord>, GatewayError> {
        Ok(Vec::new())
    }
}

pub fn record(id: &str, status: PaymentStatus, method: PaymentMethod) -> PaymentRecord {
    let now = Utc::now();
    PaymentRecord {
        id: id.to_string(),
        order_reference: "ORD-1".to_string(),
        amount: Amount::new(dec!(1500)).unwrap(),
        currency: Currency::Kes,
        method,
        status,
        gateway_reference: Some(format!("ref_{}", id)),
        redirect_url: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn mobile_money_request(order: &str) -> PaymentRequest {
    PaymentRequest {
        order_reference: order.to_string(),
        amount: dec!(1500.00),
        currency: Currency::Kes,
        method: PaymentMethod::MobileMoney,
        payer_contact: "+254712345678".to_string(),
    }
}

pub fn card_request(order: &str) -> PaymentRequest {
    PaymentRequest {
        order_reference: order.to_string(),
        amount: dec!(49.99),
        currency: Currency::Usd,
        method: PaymentMethod::Card,
        payer_contact: "buyer@example.com".to_string(),
    }
}

/// Collects every notice for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<PaymentNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<PaymentNotice> {
        self.notices.lock().unwrap().clone()
    }
}

impl PaymentNotifier for RecordingNotifier {
    fn notify(&self, notice: PaymentNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub fn generate_requests_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["order_reference", "amount", "currency", "method", "payer_contact"])?;

    for i in 1..=rows {
        let order = format!("ORD-{}", i);
        if i % 2 == 0 {
            wtr.write_record([order.as_str(), "25.00", "USD", "card", "buyer@example.com"])?;
        } else {
            wtr.write_record([order.as_str(), "1500", "KES", "mobile_money", "0712345678"])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
