use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error};

use crate::ledger::client::LedgerClient;

/// Resolves the disbursable native balance of the funding account
pub struct BalanceResolver {
    client: Arc<dyn LedgerClient>,
    account_id: String,
}

impl BalanceResolver {
    pub fn new(client: Arc<dyn LedgerClient>, account_id: String) -> Self {
        Self { client, account_id }
    }

    /// Current native balance; any failure is logged and reported as zero so
    /// the caller skips the run instead of disbursing a bogus amount
    pub async fn get_balance(&self) -> Decimal {
        let balance = self
            .client
            .load_account(&self.account_id)
            .await
            .and_then(|account| account.native_balance());

        match balance {
            Ok(amount) => {
                debug!("Funding account {} holds {} XLM", self.account_id, amount);
                amount
            }
            Err(e) => {
                error!("Error fetching distributor balance: {}", e);
                Decimal::ZERO
            }
        }
    }
}
