//! Admission of new schema revisions

use approval_types::{IgnoreReason, Rejection, Submission};

/// Holds the active submission and at most one queued replacement.
///
/// A queued submission only becomes active when nothing is active yet or
/// the active one has been rejected.
#[derive(Debug, Clone, Default)]
pub struct ResubmissionGate {
    active: Option<Submission>,
    queued: Option<Submission>,
    rejection: Option<Rejection>,
}

impl ResubmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `candidate` if it is newer than everything seen so far
    pub fn submit(&mut self, candidate: Submission) -> Result<u32, IgnoreReason> {
        if let Some(latest) = self.latest() {
            if !candidate.supersedes(latest) {
                return Err(IgnoreReason::OutdatedSubmission {
                    received: candidate.version,
                    current: latest.version,
                });
            }
        }

        let version = candidate.version;
        self.queued = Some(candidate);
        Ok(version)
    }

    pub fn reject(&mut self, rejection: Rejection) {
        self.rejection = Some(rejection);
    }

    /// Promote the queued submission when allowed
    pub fn try_resume(&mut self) -> Option<&Submission> {
        if self.queued.is_none() || (self.active.is_some() && self.rejection.is_none()) {
            return None;
        }

        self.active = self.queued.take();
        self.rejection = None;
        self.active.as_ref()
    }

    pub fn active(&self) -> Option<&Submission> {
        self.active.as_ref()
    }

    pub fn queued_version(&self) -> Option<u32> {
        self.queued.as_ref().map(|s| s.version)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        self.rejection.as_ref()
    }

    pub fn awaiting_resubmission(&self) -> bool {
        self.rejection.is_some()
    }

    fn latest(&self) -> Option<&Submission> {
        match (&self.active, &self.queued) {
            (Some(active), Some(queued)) if active.supersedes(queued) => Some(active),
            (_, Some(queued)) => Some(queued),
            (active, None) => active.as_ref(),
        }
    }
}
