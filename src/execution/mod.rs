pub mod balance;
pub mod outcome;
pub mod submitter;

pub use balance::BalanceResolver;
pub use outcome::TransactionOutcome;
pub use submitter::{PaymentSubmitter, RetryPolicy};
