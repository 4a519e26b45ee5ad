//! Ground-truth validation of extracted transactions.

pub mod ground_truth;
pub mod validator;

pub use ground_truth::{CoverageReport, GroundTruthSummary, GroundTruthTable};
pub use validator::Validator;
