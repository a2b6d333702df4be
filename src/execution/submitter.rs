use rust_decimal::Decimal;
use std::{sync::Arc, time::Duration};
use tokio::time::{self, Instant};
use tracing::{info, instrument, warn};

use crate::error::LedgerError;
use crate::ledger::{
    client::LedgerClient,
    keys::Keypair,
    models::{PaymentRequest, SubmitResponse},
};
use crate::execution::outcome::{classify, RetryKind, SubmissionReport, TransactionOutcome, REASON_CONGESTED};

/// Fee and timing limits of the submission state machine
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Starting fee per operation, in stroops
    pub baseline_fee: u32,
    /// Fee per operation the submitter never goes beyond, in stroops
    pub max_fee: u32,
    /// How long a built transaction stays valid
    pub validity: Duration,
    /// Wall-clock budget for one `send()`, retries included
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            baseline_fee: 100,
            max_fee: 2000,
            validity: Duration::from_secs(100),
            deadline: Duration::from_secs(15 * 60),
        }
    }
}

/// State threaded through the retry loop of one `send()` call
#[derive(Debug, Clone)]
pub struct SubmissionAttempt {
    pub destination: String,
    pub amount: Decimal,
    /// Escalation level; never decreases within one call
    pub fee: u32,
    pub attempts: u32,
    pub started_at: Instant,
}

impl SubmissionAttempt {
    fn new(destination: &str, amount: Decimal, baseline_fee: u32) -> Self {
        Self {
            destination: destination.to_string(),
            amount,
            fee: baseline_fee,
            attempts: 0,
            started_at: Instant::now(),
        }
    }
}

/// Builds, signs and submits native payments from the funding account,
/// retrying transient failures
pub struct PaymentSubmitter {
    client: Arc<dyn LedgerClient>,
    keypair: Arc<Keypair>,
    policy: RetryPolicy,
}

impl PaymentSubmitter {
    pub fn new(client: Arc<dyn LedgerClient>, keypair: Arc<Keypair>, policy: RetryPolicy) -> Self {
        Self { client, keypair, policy }
    }

    /// Send `amount` XLM to `destination`; returns once the outcome is
    /// resolved (success or terminal failure), never `RetryableFailure`
    #[instrument(skip(self), fields(source = %self.keypair.account_id()))]
    pub async fn send(&self, destination: &str, amount: Decimal) -> TransactionOutcome {
        let mut attempt = SubmissionAttempt::new(destination, amount, self.policy.baseline_fee);

        loop {
            attempt.attempts += 1;
            let applied_fee = self.applied_fee(&attempt).await;
            let result = self.submit_once(&attempt, applied_fee).await;

            let (kind, reason) = match classify(&SubmissionReport::from(&result)) {
                TransactionOutcome::RetryableFailure { kind, reason } => (kind, reason),
                resolved => {
                    info!(
                        "Submission resolved after {} attempt(s) at fee {}: {:?}",
                        attempt.attempts, applied_fee, resolved
                    );
                    return resolved;
                }
            };

            if kind == RetryKind::InsufficientFee {
                let next_fee = applied_fee.saturating_mul(kind.fee_multiplier());
                if applied_fee >= self.policy.max_fee || next_fee > self.policy.max_fee {
                    warn!("Fee {} rejected and cap {} reached", applied_fee, self.policy.max_fee);
                    return TransactionOutcome::terminal(REASON_CONGESTED);
                }
                attempt.fee = attempt.fee.max(next_fee);
            }

            if attempt.started_at.elapsed() + kind.wait() > self.policy.deadline {
                warn!(
                    "Retry budget of {:?} exhausted after {} attempt(s)",
                    self.policy.deadline, attempt.attempts
                );
                return TransactionOutcome::terminal(format!("retry budget exhausted: {}", reason));
            }

            warn!(
                "Attempt {} failed ({}), retrying in {:?}",
                attempt.attempts,
                kind,
                kind.wait()
            );
            time::sleep(kind.wait()).await;
        }
    }

    /// max(network base fee, escalation level), capped at the policy maximum
    async fn applied_fee(&self, attempt: &SubmissionAttempt) -> u32 {
        let network_fee = match self.client.fetch_base_fee().await {
            Ok(fee) => fee,
            Err(e) => {
                warn!("Failed to fetch base fee ({}), using baseline {}", e, self.policy.baseline_fee);
                self.policy.baseline_fee
            }
        };

        network_fee.max(attempt.fee).min(self.policy.max_fee)
    }

    async fn submit_once(&self, attempt: &SubmissionAttempt, fee_per_op: u32) -> Result<SubmitResponse, LedgerError> {
        // Fresh account state on every attempt so the sequence number is current
        let source = self.client.load_account(self.keypair.account_id()).await?;

        self.client
            .submit_payment(PaymentRequest {
                source: &source,
                destination: &attempt.destination,
                amount: attempt.amount,
                fee_per_op,
                validity: self.policy.validity,
                keypair: &self.keypair,
            })
            .await
    }
}
