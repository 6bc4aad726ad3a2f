use crate::domain::payment::PaymentRecord;
use crate::domain::ports::PaymentStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family for payment records, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";

/// A persistent payment store backed by RocksDB.
///
/// Records are stored as JSON. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDBPaymentStore {
    db: Arc<DB>,
}

impl RocksDBPaymentStore {
    /// Opens or creates a RocksDB instance at `path`, creating the payments
    /// column family if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn payments_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_PAYMENTS).ok_or_else(|| {
            PaymentError::InternalError(Box::new(std::io::Error::other(
                "Payments column family not found",
            )))
        })
    }
}

fn decode(bytes: &[u8]) -> Result<PaymentRecord> {
    serde_json::from_slice(bytes).map_err(|e| {
        PaymentError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Deserialization error: {}", e),
        )))
    })
}

#[async_trait]
impl PaymentStore for RocksDBPaymentStore {
    async fn store(&self, record: PaymentRecord) -> Result<()> {
        let cf = self.payments_cf()?;
        let value = serde_json::to_vec(&record).map_err(|e| {
            PaymentError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Serialization error: {}", e),
            )))
        })?;

        self.db.put_cf(cf, record.id.as_bytes(), value)?;
        Ok(())
    }

    async fn get(&self, payment_id: &str) -> Result<Option<PaymentRecord>> {
        let cf = self.payments_cf()?;
        match self.db.get_cf(cf, payment_id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_by_order(&self, order_reference: &str) -> Result<Vec<PaymentRecord>> {
        let cf = self.payments_cf()?;

        // Keyed by payment id, so an order lookup scans the column family.
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let record = decode(&value)?;
            if record.order_reference == order_reference {
                records.push(record);
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::{Amount, Currency, PaymentMethod, PaymentStatus};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDBPaymentStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_PAYMENTS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_payment_store() {
        let dir = tempdir().unwrap();
        let store = RocksDBPaymentStore::open(dir.path()).unwrap();

        let now = Utc::now();
        let record = PaymentRecord {
            id: "pay_1".to_string(),
            order_reference: "ORD-1".to_string(),
            amount: Amount::new(dec!(99.50)).unwrap(),
            currency: Currency::Usd,
            method: PaymentMethod::Card,
            status: PaymentStatus::Pending,
            gateway_reference: Some("pi_mock_1".to_string()),
            redirect_url: Some("https://checkout.example/pi_mock_1".to_string()),
            created_at: now,
            updated_at: now,
        };

        store.store(record.clone()).await.unwrap();

        let retrieved = store.get("pay_1").await.unwrap().unwrap();
        assert_eq!(retrieved, record);

        let found = store.find_by_order("ORD-1").await.unwrap();
        assert_eq!(found, vec![record]);
        assert!(store.find_by_order("ORD-2").await.unwrap().is_empty());

        assert!(store.get("pay_2").await.unwrap().is_none());
    }
}
