use std::str::FromStr;
use std::sync::Arc;

use crate::error::ReviewError;
use crate::models::{AssignedCourse, ReviewRequest};
use crate::store::ReviewStore;

/// A reviewer's answer to a pending assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Accepted,
    Declined,
}

impl ReviewDecision {
    pub fn message(&self) -> &'static str {
        match self {
            ReviewDecision::Accepted => "Review request accepted",
            ReviewDecision::Declined => "Review request rejected",
        }
    }
}

impl FromStr for ReviewDecision {
    type Err = ReviewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "accepted" => Ok(ReviewDecision::Accepted),
            "declined" => Ok(ReviewDecision::Declined),
            _ => Err(ReviewError::InvalidInput("Invalid status".to_string())),
        }
    }
}

/// Owns the course/reviewer link and its pending -> accepted transition.
#[derive(Clone)]
pub struct AssignmentManager {
    store: Arc<dyn ReviewStore>,
}

impl AssignmentManager {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    pub async fn list_assigned_courses(&self, reviewer_id: i32) -> Result<Vec<AssignedCourse>, ReviewError> {
        Ok(self.store.assigned_courses(reviewer_id).await?)
    }

    pub async fn list_pending_requests(&self, reviewer_id: i32) -> Result<Vec<ReviewRequest>, ReviewError> {
        Ok(self.store.pending_requests(reviewer_id).await?)
    }

    /// Accepting flips the status; declining deletes the row so the reviewer
    /// can be assigned again later.
    pub async fn respond(
        &self,
        course_id: i32,
        reviewer_id: i32,
        decision: ReviewDecision,
    ) -> Result<(), ReviewError> {
        let affected = match decision {
            ReviewDecision::Accepted => self.store.accept_assignment(course_id, reviewer_id).await?,
            ReviewDecision::Declined => self.store.delete_assignment(course_id, reviewer_id).await?,
        };

        if affected == 0 {
            return Err(ReviewError::NotFound("Review request"));
        }

        tracing::info!(course_id, reviewer_id, ?decision, "review request answered");
        Ok(())
    }
}
