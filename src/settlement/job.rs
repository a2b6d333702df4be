// Disbursement job - one run per scheduler tick
//
// 1. Resolve the funding account balance
// 2. Skip with "Insufficient balance" when there is nothing to send
// 3. Send a fixed fraction of the balance to the receiver
// 4. Journal the resolved outcome (exactly one line per run)

use chrono::{DateTime, Local};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

use crate::error::AppResult;
use crate::execution::{BalanceResolver, PaymentSubmitter, TransactionOutcome};
use crate::ledger::models::{AMOUNT_SCALE, NATIVE_ASSET_CODE};
use crate::settlement::journal::{JournalEntry, JournalSink};

/// Share of the balance sent on every run
pub const DISBURSEMENT_FRACTION: Decimal = dec!(0.25);

pub const REASON_INSUFFICIENT_BALANCE: &str = "Insufficient balance";

/// round(balance * 0.25, 7)
pub fn disbursement_amount(balance: Decimal) -> Decimal {
    (balance * DISBURSEMENT_FRACTION)
        .round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Journal key of a run, derived from its start time
pub fn run_id(started_at: &DateTime<Local>) -> String {
    started_at.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// What one run resolved to
#[derive(Debug, Clone)]
pub struct DisbursementRun {
    pub run_id: String,
    pub balance: Decimal,
    pub amount: Decimal,
    /// `None` when the run was skipped for lack of balance
    pub outcome: Option<TransactionOutcome>,
}

pub struct DisbursementJob {
    resolver: BalanceResolver,
    submitter: PaymentSubmitter,
    journal: Arc<dyn JournalSink>,
    receiver: String,
}

impl DisbursementJob {
    pub fn new(
        resolver: BalanceResolver,
        submitter: PaymentSubmitter,
        journal: Arc<dyn JournalSink>,
        receiver: String,
    ) -> Self {
        Self {
            resolver,
            submitter,
            journal,
            receiver,
        }
    }

    pub async fn run(&self) -> AppResult<DisbursementRun> {
        let started_at = Local::now();
        let run_id = run_id(&started_at);

        let balance = self.resolver.get_balance().await;
        if balance <= Decimal::ZERO {
            let entry = JournalEntry::failure(&self.receiver, Decimal::ZERO, REASON_INSUFFICIENT_BALANCE);
            self.record(&run_id, &entry).await?;
            return Ok(DisbursementRun {
                run_id,
                balance,
                amount: Decimal::ZERO,
                outcome: None,
            });
        }

        let amount = disbursement_amount(balance);
        info!(
            "Starting transaction at {} with amount: {} {}",
            started_at.format("%Y-%m-%d %H:%M:%S"),
            amount,
            NATIVE_ASSET_CODE
        );

        let outcome = self.submitter.send(&self.receiver, amount).await;
        let entry = match &outcome {
            TransactionOutcome::Success { .. } => JournalEntry::success(&self.receiver, amount),
            TransactionOutcome::TerminalFailure { reason } => {
                JournalEntry::failure(&self.receiver, amount, reason.clone())
            }
            // send() only returns resolved outcomes
            TransactionOutcome::RetryableFailure { reason, .. } => {
                JournalEntry::failure(&self.receiver, amount, reason.clone())
            }
        };
        self.record(&run_id, &entry).await?;

        Ok(DisbursementRun {
            run_id,
            balance,
            amount,
            outcome: Some(outcome),
        })
    }

    async fn record(&self, run_id: &str, entry: &JournalEntry) -> AppResult<()> {
        let line = entry.to_string();
        info!("{}", line);
        self.journal.append(run_id, &line).await
    }
}
