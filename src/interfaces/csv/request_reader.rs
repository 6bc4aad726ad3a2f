use crate::domain::payment::PaymentRequest;
use crate::error::{PaymentError, Result};
use std::io::Read;

/// Reads payment requests from a CSV source.
///
/// Expected header: `order_reference, amount, currency, method, payer_contact`.
/// Whitespace around fields is trimmed; an empty `currency` means KES, while an
/// unknown one fails the row.
pub struct PaymentRequestReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> PaymentRequestReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes one request per row.
    pub fn requests(self) -> impl Iterator<Item = Result<PaymentRequest>> {
        self.reader
            .into_deserialize::<CsvRow>()
            .map(|result| result.map(PaymentRequest::from).map_err(PaymentError::from))
    }
}

#[derive(serde::Deserialize)]
struct CsvRow {
    order_reference: String,
    amount: rust_decimal::Decimal,
    #[serde(default)]
    currency: Option<crate::domain::payment::Currency>,
    method: crate::domain::payment::PaymentMethod,
    #[serde(default)]
    payer_contact: String,
}

impl From<CsvRow> for PaymentRequest {
    fn from(row: CsvRow) -> Self {
        Self {
            order_reference: row.order_reference,
            amount: row.amount,
            currency: row.currency.unwrap_or_default(),
            method: row.method,
            payer_contact: row.payer_contact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Currency, PaymentMethod};
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "order_reference, amount, currency, method, payer_contact\n\
                    ORD-1, 1500.00, KES, mobile_money, 0712345678\n\
                    ORD-2, 20.5, USD, card, buyer@example.com\n\
                    ORD-3, 99, , mpesa, +254700000000";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.order_reference, "ORD-1");
        assert_eq!(first.amount, dec!(1500.00));
        assert_eq!(first.method, PaymentMethod::MobileMoney);

        let second = results[1].as_ref().unwrap();
        assert_eq!(second.currency, Currency::Usd);
        assert_eq!(second.method, PaymentMethod::Card);

        let third = results[2].as_ref().unwrap();
        assert_eq!(third.currency, Currency::Kes);
        assert_eq!(third.method, PaymentMethod::MobileMoney);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "order_reference, amount, currency, method, payer_contact\n\
                    ORD-1, lots, KES, mobile_money, 0712345678\n\
                    ORD-2, 10, KES, cheque, 0712345678";
        let reader = PaymentRequestReader::new(data.as_bytes());
        let results: Vec<Result<PaymentRequest>> = reader.requests().collect();

        assert!(results[0].is_err());
        assert!(results[1].is_err());
    }
}
