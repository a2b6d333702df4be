// Submission outcome classification
//
// Maps whatever came back from the ledger client (a well-formed response or
// an error) to a tagged outcome. No I/O happens here; the retry loop in
// `submitter` acts on the result.

use std::{fmt, time::Duration};

use crate::error::LedgerError;
use crate::ledger::models::{ResultCodes, SubmitResponse};

pub const TX_BAD_SEQ: &str = "tx_bad_seq";
pub const TX_TOO_LATE: &str = "tx_too_late";
pub const TX_INSUFFICIENT_FEE: &str = "tx_insufficient_fee";
pub const TX_FAILED: &str = "tx_failed";
pub const OP_UNDERFUNDED: &str = "op_underfunded";

pub const GATEWAY_TIMEOUT: u16 = 504;

pub const REASON_UNDERFUNDED: &str = "insufficient funds in funding account";
pub const REASON_CONGESTED: &str = "network congested, try later";

/// Why a submission is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// Horizon gave up waiting for the network (504) or the request timed out
    GatewayTimeout,
    /// Sequence number no longer matches the account
    BadSequence,
    /// Validity window closed before the transaction was included
    TooLate,
    /// Fee below what the network currently charges
    InsufficientFee,
}

impl RetryKind {
    /// Pause before the next attempt
    pub fn wait(&self) -> Duration {
        match self {
            RetryKind::GatewayTimeout => Duration::from_secs(5),
            RetryKind::BadSequence | RetryKind::TooLate | RetryKind::InsufficientFee => Duration::from_secs(1),
        }
    }

    /// Factor applied to the fee for the next attempt
    pub fn fee_multiplier(&self) -> u32 {
        match self {
            RetryKind::InsufficientFee => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for RetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RetryKind::GatewayTimeout => "gateway timeout",
            RetryKind::BadSequence => "bad sequence number",
            RetryKind::TooLate => "transaction submitted too late",
            RetryKind::InsufficientFee => "insufficient fee",
        };
        write!(f, "{}", name)
    }
}

/// Result of one submission, or of a whole `send()` once resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Success { hash: Option<String> },
    RetryableFailure { kind: RetryKind, reason: String },
    TerminalFailure { reason: String },
}

impl TransactionOutcome {
    pub fn terminal(reason: impl Into<String>) -> Self {
        TransactionOutcome::TerminalFailure { reason: reason.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransactionOutcome::Success { .. })
    }
}

/// Normalized view of a submission result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub successful: bool,
    pub hash: Option<String>,
    pub status: Option<u16>,
    pub timed_out: bool,
    pub result_codes: Option<ResultCodes>,
    pub detail: String,
}

impl From<&Result<SubmitResponse, LedgerError>> for SubmissionReport {
    fn from(result: &Result<SubmitResponse, LedgerError>) -> Self {
        match result {
            Ok(response) => SubmissionReport {
                successful: response.successful,
                hash: response.hash.clone(),
                status: None,
                timed_out: false,
                result_codes: response.result_codes.clone(),
                detail: match &response.result_codes {
                    Some(codes) => format!("Transaction response: {}", codes),
                    None => "Transaction response: unsuccessful".to_string(),
                },
            },
            Err(error) => SubmissionReport {
                successful: false,
                hash: None,
                status: error.status(),
                timed_out: matches!(error, LedgerError::Timeout),
                result_codes: error.result_codes().cloned(),
                detail: match error.result_codes() {
                    Some(codes) => format!("Error: {} ({})", error, codes),
                    None => format!("Error: {}", error),
                },
            },
        }
    }
}

/// Classify a submission; first matching rule wins
pub fn classify(report: &SubmissionReport) -> TransactionOutcome {
    if report.successful {
        return TransactionOutcome::Success {
            hash: report.hash.clone(),
        };
    }

    if report.timed_out || report.status == Some(GATEWAY_TIMEOUT) {
        return retry(RetryKind::GatewayTimeout, report);
    }

    let codes = report.result_codes.as_ref();
    let tx_code = codes.map(|c| c.transaction.as_str()).unwrap_or_default();

    match tx_code {
        TX_BAD_SEQ => retry(RetryKind::BadSequence, report),
        TX_TOO_LATE => retry(RetryKind::TooLate, report),
        TX_INSUFFICIENT_FEE => retry(RetryKind::InsufficientFee, report),
        TX_FAILED if codes.is_some_and(|c| c.has_operation(OP_UNDERFUNDED)) => {
            TransactionOutcome::terminal(REASON_UNDERFUNDED)
        }
        _ => TransactionOutcome::terminal(report.detail.clone()),
    }
}

fn retry(kind: RetryKind, report: &SubmissionReport) -> TransactionOutcome {
    TransactionOutcome::RetryableFailure {
        kind,
        reason: report.detail.clone(),
    }
}
