use tracing::{info, warn};

use super::assessor::{Assessor, AssessmentOutcome, AssessmentTask};
use crate::prov::ProvenanceApi;

impl AssessmentTask {
    pub fn run(&self, api: &dyn ProvenanceApi) -> AssessmentOutcome {
        let result = match &self.assessor {
            Assessor::Taint => api.taint_sources(&self.oid),
            Assessor::TermFinder { term } | Assessor::BadTermFinder { term } => {
                api.term_finder(&self.oid, term)
            }
        };

        let error = result.as_ref().err().map(|error| format!("{error:#}"));
        let verdict = self.assessor.verdict(match &result {
            Ok(matches) => Ok(*matches),
            Err(_) => Err(error.as_deref().unwrap_or_default()),
        });

        match &error {
            Some(error) => warn!(
                assessor = self.assessor.name(),
                oid = %self.oid,
                error = %error,
                "assessment failed"
            ),
            None => info!(
                assessor = self.assessor.name(),
                oid = %self.oid,
                verdict = %verdict,
                "assessment finished"
            ),
        }

        AssessmentOutcome {
            assessor_id: self.assessor_id,
            oid: self.oid.clone(),
            verdict,
            error,
        }
    }
}

/// Runs `tasks` one after another, handing each outcome to `report` as soon
/// as it is known. A failing task does not stop the list; `report` returning
/// false does. Returns how many tasks ran.
pub fn run_tasks<F>(api: &dyn ProvenanceApi, tasks: Vec<AssessmentTask>, mut report: F) -> usize
where
    F: FnMut(AssessmentOutcome) -> bool,
{
    let mut ran = 0;
    for task in tasks {
        ran += 1;
        if !report(task.run(api)) {
            break;
        }
    }
    ran
}
