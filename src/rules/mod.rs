pub mod builtin;
pub mod types;

pub use builtin::{all_checks, checks_for};
pub use types::{Check, CheckOutcome, DraftFinding, FindingStatus, Severity};
