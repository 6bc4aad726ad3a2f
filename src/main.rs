use bazaar_payments::application::checkout::{CheckoutFlow, TracingNotifier};
use bazaar_payments::application::poller::PollOptions;
use bazaar_payments::config::SandboxConfig;
use bazaar_payments::domain::payment::{PaymentRecord, PaymentStatus};
use bazaar_payments::domain::ports::PaymentStoreBox;
use bazaar_payments::infrastructure::in_memory::InMemoryPaymentStore;
use bazaar_payments::infrastructure::sandbox::SandboxGateway;
use bazaar_payments::interfaces::csv::outcome_writer::{OutcomeRow, OutcomeWriter};
use bazaar_payments::interfaces::csv::request_reader::PaymentRequestReader;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment requests CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Status fetches per mobile-money payment before giving up
    #[arg(long, default_value_t = 10)]
    max_attempts: u32,

    /// Delay between status fetches, in milliseconds
    #[arg(long, default_value_t = 3000)]
    interval_ms: u64,

    /// Overall ceiling for one poll session, in milliseconds
    #[arg(long, default_value_t = 45000)]
    timeout_ms: u64,
}

/// A completed payment already recorded for the order, if any. Lookup
/// failures are logged by the flow and treated as "none".
async fn completed_payment(flow: &CheckoutFlow, order_reference: &str) -> Option<PaymentRecord> {
    flow.order_payments(order_reference)
        .await
        .ok()?
        .into_iter()
        .find(|r| r.status == PaymentStatus::Completed)
}

fn open_store(db_path: Option<PathBuf>) -> Result<PaymentStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = bazaar_payments::infrastructure::rocksdb::RocksDBPaymentStore::open(path)
                .into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryPaymentStore::new()))
        }
        None => Ok(Box::new(InMemoryPaymentStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let options = PollOptions::default()
        .with_max_attempts(cli.max_attempts)
        .with_interval(Duration::from_millis(cli.interval_ms))
        .with_timeout(Duration::from_millis(cli.timeout_ms));

    let sandbox = SandboxConfig::from_env().into_diagnostic()?;
    let store = open_store(cli.db_path)?;
    let gateway = Arc::new(SandboxGateway::new(store, sandbox));
    let flow = CheckoutFlow::new(gateway, Arc::new(TracingNotifier), options);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = PaymentRequestReader::new(file);

    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    for request in reader.requests() {
        if cancel.is_cancelled() {
            warn!("interrupted; remaining payment requests skipped");
            break;
        }
        match request {
            Ok(request) => {
                let row = match completed_payment(&flow, &request.order_reference).await {
                    Some(paid) => OutcomeRow::already_paid(&paid),
                    None => {
                        let result = flow.pay(&request, &cancel).await;
                        OutcomeRow::from_result(&request.order_reference, &result)
                    }
                };
                writer.write_row(&row).into_diagnostic()?;
            }
            Err(e) => {
                eprintln!("Error reading payment request: {}", e);
            }
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
