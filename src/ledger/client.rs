use async_trait::async_trait;

use crate::error::LedgerError;
use crate::ledger::models::{AccountState, PaymentRequest, SubmitResponse};

/// Ledger client - the network capabilities the disbursement core consumes
///
/// Implemented by the Horizon HTTP client in production and by scripted
/// doubles in tests.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Load sequence number and balances of an account
    async fn load_account(&self, account_id: &str) -> Result<AccountState, LedgerError>;

    /// Network-suggested base fee per operation, in stroops
    async fn fetch_base_fee(&self) -> Result<u32, LedgerError>;

    /// Build, sign and submit a single native payment
    ///
    /// A well-formed response is returned as `Ok` even when the transaction
    /// failed; transport errors and non-success statuses are `Err`.
    async fn submit_payment(&self, request: PaymentRequest<'_>) -> Result<SubmitResponse, LedgerError>;
}
