use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::error::ReviewError;
use crate::models::{FeedbackEntry, PendingFeedback, ReviewTopic};
use crate::store::{ReviewStore, StoreError};

pub const RATING_RANGE: RangeInclusive<i32> = 1..=5;

/// Per-file, per-reviewer feedback. A reviewer submits once per file and
/// edits afterwards; uniqueness is left to the storage layer.
#[derive(Clone)]
pub struct FeedbackLedger {
    store: Arc<dyn ReviewStore>,
}

fn validate(entry: &FeedbackEntry) -> Result<(), ReviewError> {
    if entry.feedback_text.trim().is_empty() {
        return Err(ReviewError::InvalidInput("Feedback can't be empty".to_string()));
    }

    if entry.quality.trim().is_empty() {
        return Err(ReviewError::InvalidInput("Quality can't be empty".to_string()));
    }

    if !RATING_RANGE.contains(&entry.rating) {
        return Err(ReviewError::InvalidInput(format!(
            "Rating must be between {} and {}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }

    Ok(())
}

impl FeedbackLedger {
    pub fn new(store: Arc<dyn ReviewStore>) -> Self {
        Self { store }
    }

    pub async fn list_review_topics(&self, course_id: i32) -> Result<Vec<ReviewTopic>, ReviewError> {
        Ok(self.store.review_topics(course_id).await?)
    }

    pub async fn list_pending_feedback(&self, reviewer_id: i32) -> Result<Vec<PendingFeedback>, ReviewError> {
        Ok(self.store.pending_feedback(reviewer_id).await?)
    }

    pub async fn submit(&self, entry: FeedbackEntry) -> Result<(), ReviewError> {
        validate(&entry)?;
        let (file_id, reviewer_id) = (entry.file_id, entry.reviewer_id);

        match self.store.insert_feedback(entry).await {
            Ok(()) => {
                tracing::info!(file_id, reviewer_id, "feedback submitted");
                Ok(())
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                tracing::debug!(file_id, reviewer_id, %constraint, "duplicate feedback rejected");
                Err(ReviewError::DuplicateFeedback)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Only the row matching (file, reviewer, course) is touched.
    pub async fn edit(&self, entry: FeedbackEntry) -> Result<(), ReviewError> {
        validate(&entry)?;
        let (file_id, reviewer_id) = (entry.file_id, entry.reviewer_id);

        if self.store.update_feedback(entry).await? == 0 {
            return Err(ReviewError::NotFound("Feedback"));
        }

        tracing::info!(file_id, reviewer_id, "feedback updated");
        Ok(())
    }
}
