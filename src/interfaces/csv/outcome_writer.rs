use crate::application::checkout::PaymentOutcome;
use crate::domain::payment::PaymentRecord;
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::io::Write;

/// One line of checkout output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeRow {
    pub order_reference: String,
    pub payment_id: Option<String>,
    pub outcome: String,
    pub status: Option<String>,
    pub gateway_reference: Option<String>,
    pub redirect_url: Option<String>,
}

impl OutcomeRow {
    pub fn from_result(order_reference: &str, result: &Result<PaymentOutcome>) -> Self {
        match result {
            Ok(PaymentOutcome::Redirect {
                record,
                redirect_url,
            }) => Self::with_record(record, "redirect", Some(redirect_url.clone())),
            Ok(PaymentOutcome::Settled(record)) => {
                Self::with_record(record, &record.status.to_string(), None)
            }
            Err(PaymentError::PollTimeout {
                payment_id,
                last_record,
                ..
            }) => Self {
                order_reference: order_reference.to_string(),
                payment_id: Some(payment_id.clone()),
                outcome: "timeout".to_string(),
                status: last_record.as_ref().map(|r| r.status.to_string()),
                gateway_reference: last_record
                    .as_ref()
                    .and_then(|r| r.gateway_reference.clone()),
                redirect_url: None,
            },
            Err(PaymentError::StatusRegression { payment_id, to, .. }) => Self {
                order_reference: order_reference.to_string(),
                payment_id: Some(payment_id.clone()),
                outcome: "data_error".to_string(),
                status: Some(to.to_string()),
                gateway_reference: None,
                redirect_url: None,
            },
            Err(e) => Self {
                order_reference: order_reference.to_string(),
                payment_id: None,
                outcome: e.kind().to_string(),
                status: None,
                gateway_reference: None,
                redirect_url: None,
            },
        }
    }

    /// The order already has a completed payment; nothing new was created.
    pub fn already_paid(record: &PaymentRecord) -> Self {
        Self::with_record(record, "already_paid", None)
    }

    fn with_record(record: &PaymentRecord, outcome: &str, redirect_url: Option<String>) -> Self {
        Self {
            order_reference: record.order_reference.clone(),
            payment_id: Some(record.id.clone()),
            outcome: outcome.to_string(),
            status: Some(record.status.to_string()),
            gateway_reference: record.gateway_reference.clone(),
            redirect_url,
        }
    }
}

/// Writes checkout outcomes as CSV with a header row.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_row(&mut self, row: &OutcomeRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
