// Disbursement runs: the per-tick job, its journal and the scheduler driving it
pub mod job;
pub mod journal;
pub mod scheduler;

pub use job::DisbursementJob;
pub use journal::FileJournal;
pub use scheduler::{DisbursementScheduler, ScheduleConfig};
