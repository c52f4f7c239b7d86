use std::fmt;

use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verdict {
    Green,
    Yellow,
    Red,
    #[default]
    None,
}

impl Verdict {
    pub fn name(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::None => "not assessed",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an assessor checks about the lineage of the selected object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assessor {
    /// Red when any taint marking lies upstream, yellow otherwise.
    Taint,
    /// Green when a term you expect appears in the lineage.
    TermFinder { term: String },
    /// Red when a term you do not want appears in the lineage.
    BadTermFinder { term: String },
}

impl Assessor {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Taint => "Taint",
            Self::TermFinder { .. } => "Term finder",
            Self::BadTermFinder { .. } => "Bad term finder",
        }
    }

    pub fn is_configurable(&self) -> bool {
        !matches!(self, Self::Taint)
    }

    pub fn term(&self) -> Option<&str> {
        match self {
            Self::Taint => None,
            Self::TermFinder { term } | Self::BadTermFinder { term } => Some(term),
        }
    }

    /// Verdict for a completed lookup: `matches` is the number of taint
    /// markings or term hits the service reported. Failed lookups are red.
    pub fn verdict(&self, matches: Result<usize, &str>) -> Verdict {
        let Ok(matches) = matches else {
            return Verdict::Red;
        };
        match self {
            Self::Taint if matches == 0 => Verdict::Yellow,
            Self::Taint => Verdict::Red,
            Self::TermFinder { .. } if matches > 0 => Verdict::Green,
            Self::TermFinder { .. } => Verdict::Yellow,
            Self::BadTermFinder { .. } if matches > 0 => Verdict::Red,
            Self::BadTermFinder { .. } => Verdict::Green,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssessorEntry {
    pub id: u32,
    pub assessor: Assessor,
    pub verdict: Verdict,
    pub assessed: Option<String>,
    pub error: Option<String>,
}

/// One pending run of an assessor against an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssessmentTask {
    pub assessor_id: u32,
    pub oid: String,
    pub assessor: Assessor,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssessmentOutcome {
    pub assessor_id: u32,
    pub oid: String,
    pub verdict: Verdict,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct AssessorSet {
    entries: Vec<AssessorEntry>,
    next_id: u32,
}

impl AssessorSet {
    pub fn entries(&self) -> &[AssessorEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add(&mut self, assessor: Assessor) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        debug!(id, assessor = assessor.name(), "assessor added");
        self.entries.push(AssessorEntry {
            id,
            assessor,
            verdict: Verdict::None,
            assessed: None,
            error: None,
        });
        id
    }

    pub fn remove(&mut self, id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        before != self.entries.len()
    }

    /// Changes the term of a configurable assessor. A different term forces
    /// the next run even on an object assessed before.
    pub fn configure(&mut self, id: u32, new_term: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        let term = match &mut entry.assessor {
            Assessor::Taint => return false,
            Assessor::TermFinder { term } | Assessor::BadTermFinder { term } => term,
        };
        if term != new_term {
            *term = new_term.to_owned();
            entry.assessed = None;
        }
        true
    }

    /// Tasks for every assessor that has not yet assessed `oid`. Scheduled
    /// assessors count as assessed from here on, so repeated calls for the
    /// same object yield nothing new.
    pub fn schedule(&mut self, oid: &str) -> Vec<AssessmentTask> {
        self.entries
            .iter_mut()
            .filter(|entry| entry.assessed.as_deref() != Some(oid))
            .map(|entry| {
                entry.assessed = Some(oid.to_owned());
                AssessmentTask {
                    assessor_id: entry.id,
                    oid: oid.to_owned(),
                    assessor: entry.assessor.clone(),
                }
            })
            .collect()
    }

    /// Records an outcome unless the assessor was removed or has moved on to
    /// another object since.
    pub fn apply(&mut self, outcome: AssessmentOutcome) -> bool {
        let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == outcome.assessor_id)
        else {
            return false;
        };
        if entry.assessed.as_deref() != Some(outcome.oid.as_str()) {
            debug!(id = entry.id, oid = %outcome.oid, "ignoring outdated assessment");
            return false;
        }
        entry.verdict = outcome.verdict;
        entry.error = outcome.error;
        true
    }

    /// Overall light: only greens is green, reds without greens is red,
    /// anything else is yellow.
    pub fn summary_verdict(&self) -> Verdict {
        let count = |wanted: Verdict| {
            self.entries
                .iter()
                .filter(|entry| entry.verdict == wanted)
                .count()
        };
        let (green, yellow, red) = (
            count(Verdict::Green),
            count(Verdict::Yellow),
            count(Verdict::Red),
        );

        if green > 0 && yellow == 0 && red == 0 {
            Verdict::Green
        } else if green == 0 && red > 0 {
            Verdict::Red
        } else {
            Verdict::Yellow
        }
    }
}
