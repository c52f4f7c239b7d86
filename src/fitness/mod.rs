//! Traffic-light assessors that judge the lineage of the selected object.

mod assessor;
mod runner;

pub use assessor::{AssessmentOutcome, AssessmentTask, Assessor, AssessorSet, Verdict};
pub use runner::run_tasks;
