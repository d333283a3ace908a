//! Concurrent fan-out of review calls within a round

use crate::activities::ApprovalActivities;
use crate::error::Result;
use crate::retry::RetryPolicy;
use approval_types::{ReviewAssignment, ReviewOutcome, ReviewRequest};
use futures::future::try_join_all;

/// Issues one remote call per stage of a round and joins them.
///
/// The first exhausted call aborts the round; the remaining calls are dropped.
pub struct ReviewDispatcher<'a, A: ?Sized> {
    activities: &'a A,
    retry: &'a RetryPolicy,
}

impl<'a, A> ReviewDispatcher<'a, A>
where
    A: ApprovalActivities + ?Sized,
{
    pub fn new(activities: &'a A, retry: &'a RetryPolicy) -> Self {
        Self { activities, retry }
    }

    /// Notify every reviewer of the round
    pub async fn dispatch(&self, assignments: &[ReviewAssignment]) -> Result<()> {
        let calls = assignments.iter().map(|assignment| async move {
            let operation = format!("dispatch_review({})", assignment.stage);
            self.retry
                .run(&operation, || self.activities.dispatch_review(assignment))
                .await
        });
        try_join_all(calls).await?;
        Ok(())
    }

    /// Perform every planned review of the round
    pub async fn perform(&self, requests: &[ReviewRequest]) -> Result<Vec<ReviewOutcome>> {
        let calls = requests.iter().map(|request| async move {
            let operation = format!("perform_review({})", request.stage);
            self.retry
                .run(&operation, || self.activities.perform_review(request))
                .await
        });
        try_join_all(calls).await
    }
}
