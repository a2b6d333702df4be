use std::{fmt, str::FromStr, time::Duration};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::ledger::keys::Keypair;

/// Horizon tag for the native asset (XLM)
pub const NATIVE_ASSET_TYPE: &str = "native";

/// Display code of the native asset
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// 1 XLM = 10,000,000 stroops
pub const STROOPS_PER_XLM: i64 = 10_000_000;

/// Finest amount granularity the ledger accepts
pub const AMOUNT_SCALE: u32 = 7;

/// One balance line of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub asset_type: String,
    pub balance: String,
}

impl Balance {
    pub fn is_native(&self) -> bool {
        self.asset_type == NATIVE_ASSET_TYPE
    }

    pub fn amount(&self) -> Result<Decimal, LedgerError> {
        Decimal::from_str(&self.balance)
            .map_err(|e| LedgerError::Malformed(format!("Invalid balance '{}': {}", self.balance, e)))
    }
}

/// Account as returned by `GET /accounts/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    pub account_id: String,
    pub sequence: String,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

impl AccountState {
    pub fn sequence_number(&self) -> Result<i64, LedgerError> {
        self.sequence
            .parse::<i64>()
            .map_err(|_| LedgerError::Malformed(format!("Invalid sequence number: {}", self.sequence)))
    }

    /// Sequence number the next transaction from this account must carry
    pub fn next_sequence(&self) -> Result<i64, LedgerError> {
        self.sequence_number()?
            .checked_add(1)
            .ok_or_else(|| LedgerError::Malformed("Sequence number overflow".to_string()))
    }

    /// The native balance entry; absent native balance is an error
    pub fn native_balance(&self) -> Result<Decimal, LedgerError> {
        self.balances
            .iter()
            .find(|b| b.is_native())
            .ok_or(LedgerError::MissingNativeBalance)?
            .amount()
    }
}

/// `extras.result_codes` of a Horizon transaction result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCodes {
    #[serde(default)]
    pub transaction: String,
    #[serde(default)]
    pub operations: Vec<String>,
}

impl ResultCodes {
    pub fn has_operation(&self, code: &str) -> bool {
        self.operations.iter().any(|op| op == code)
    }
}

impl fmt::Display for ResultCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operations.is_empty() {
            write!(f, "{}", self.transaction)
        } else {
            write!(f, "{} [{}]", self.transaction, self.operations.join(", "))
        }
    }
}

/// Result of a submission that reached Horizon and came back well-formed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub successful: bool,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub result_codes: Option<ResultCodes>,
}

/// Everything a ledger client needs to build, sign and submit one payment
pub struct PaymentRequest<'a> {
    pub source: &'a AccountState,
    pub destination: &'a str,
    pub amount: Decimal,
    pub fee_per_op: u32,
    pub validity: Duration,
    pub keypair: &'a Keypair,
}

/// Convert an XLM amount into stroops, rejecting sub-stroop precision
pub fn to_stroops(amount: Decimal) -> Result<i64, LedgerError> {
    if amount.is_sign_negative() {
        return Err(LedgerError::Encoding(format!("Negative amount: {}", amount)));
    }
    if amount.round_dp(AMOUNT_SCALE) != amount {
        return Err(LedgerError::Encoding(format!(
            "Amount {} has more than {} fractional digits",
            amount, AMOUNT_SCALE
        )));
    }

    (amount * Decimal::from(STROOPS_PER_XLM))
        .trunc()
        .to_i64()
        .ok_or_else(|| LedgerError::Encoding(format!("Amount out of range: {}", amount)))
}
