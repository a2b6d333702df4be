//! Test doubles shared by unit tests
//!
//! `ScriptedLedger` plays back queued submission results and records every
//! call the disbursement core makes against it.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

use crate::error::{AppResult, LedgerError};
use crate::ledger::{
    client::LedgerClient,
    models::{AccountState, Balance, PaymentRequest, ResultCodes, SubmitResponse},
};
use crate::settlement::journal::JournalSink;

pub const FUNDING_SEED: &str = "SAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB6NKI";
pub const FUNDING_ACCOUNT: &str = "GAB2CB576PHBBPQ5ODORRZ2LYCMWPZGWGCN2KDK7DXOIMZASKUY3QZ6Q";
pub const RECEIVER: &str = "GDVEU3DD4KOFECV66VIHWEZOYX4ZKR3WV27L464SIIPOU2IUI3JCZA57";

/// One payment the double saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSubmission {
    pub destination: String,
    pub amount: rust_decimal::Decimal,
    pub fee_per_op: u32,
    pub sequence: i64,
}

struct State {
    sequence: i64,
    balances: Vec<Balance>,
    base_fee: Result<u32, LedgerError>,
    account_error: Option<LedgerError>,
    script: VecDeque<Result<SubmitResponse, LedgerError>>,
    account_loads: usize,
    submissions: Vec<RecordedSubmission>,
}

pub struct ScriptedLedger {
    state: Mutex<State>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                sequence: 1000,
                balances: vec![Balance {
                    asset_type: "native".to_string(),
                    balance: "100.0000000".to_string(),
                }],
                base_fee: Ok(100),
                account_error: None,
                script: VecDeque::new(),
                account_loads: 0,
                submissions: Vec::new(),
            }),
        }
    }

    pub fn account_id(&self) -> String {
        FUNDING_ACCOUNT.to_string()
    }

    pub fn set_balances(&self, balances: Vec<(&str, &str)>) {
        self.state.lock().balances = balances
            .into_iter()
            .map(|(asset_type, balance)| Balance {
                asset_type: asset_type.to_string(),
                balance: balance.to_string(),
            })
            .collect();
    }

    pub fn set_base_fee(&self, fee: Result<u32, LedgerError>) {
        self.state.lock().base_fee = fee;
    }

    pub fn fail_account_loads(&self, error: LedgerError) {
        self.state.lock().account_error = Some(error);
    }

    /// Queue the result of the next submission
    pub fn push(&self, result: Result<SubmitResponse, LedgerError>) {
        self.state.lock().script.push_back(result);
    }

    pub fn push_success(&self) {
        self.push(Ok(SubmitResponse {
            successful: true,
            hash: Some("c0ffee".to_string()),
            result_codes: None,
        }));
    }

    /// Queue a Horizon 400 with the given result codes
    pub fn push_rejection(&self, transaction: &str, operations: &[&str]) {
        self.push(Err(LedgerError::Status {
            status: 400,
            detail: "Transaction Failed".to_string(),
            result_codes: Some(ResultCodes {
                transaction: transaction.to_string(),
                operations: operations.iter().map(|s| s.to_string()).collect(),
            }),
        }));
    }

    pub fn push_status(&self, status: u16) {
        self.push(Err(LedgerError::Status {
            status,
            detail: "Timeout".to_string(),
            result_codes: None,
        }));
    }

    pub fn account_loads(&self) -> usize {
        self.state.lock().account_loads
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.state.lock().submissions.clone()
    }

    pub fn fees(&self) -> Vec<u32> {
        self.submissions().iter().map(|s| s.fee_per_op).collect()
    }
}

#[async_trait]
impl LedgerClient for ScriptedLedger {
    async fn load_account(&self, account_id: &str) -> Result<AccountState, LedgerError> {
        let mut state = self.state.lock();
        state.account_loads += 1;
        if let Some(error) = &state.account_error {
            return Err(error.clone());
        }
        Ok(AccountState {
            account_id: account_id.to_string(),
            sequence: state.sequence.to_string(),
            balances: state.balances.clone(),
        })
    }

    async fn fetch_base_fee(&self) -> Result<u32, LedgerError> {
        self.state.lock().base_fee.clone()
    }

    async fn submit_payment(&self, request: PaymentRequest<'_>) -> Result<SubmitResponse, LedgerError> {
        let mut state = self.state.lock();
        state.submissions.push(RecordedSubmission {
            destination: request.destination.to_string(),
            amount: request.amount,
            fee_per_op: request.fee_per_op,
            sequence: request.source.next_sequence()?,
        });

        let result = state.script.pop_front().unwrap_or_else(|| {
            Err(LedgerError::Transport("script exhausted".to_string()))
        });
        // Other traffic moves the account sequence on between attempts
        state.sequence += 1;
        result
    }
}

/// Journal keeping lines in memory, grouped by run id
#[derive(Default)]
pub struct MemoryJournal {
    lines: Mutex<HashMap<String, Vec<String>>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_lines(&self) -> Vec<String> {
        self.lines.lock().values().flatten().cloned().collect()
    }
}

#[async_trait]
impl JournalSink for MemoryJournal {
    async fn append(&self, run_id: &str, line: &str) -> AppResult<()> {
        self.lines
            .lock()
            .entry(run_id.to_string())
            .or_default()
            .push(line.to_string());
        Ok(())
    }
}
