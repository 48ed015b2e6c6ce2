//! Persistence gateway used by the assignment manager, the feedback ledger and
//! the session resolver.
//!
//! `PgReviewStore` (in `connection`) is the production backend. Tests run
//! against `memory_store::InMemoryReviewStore`, which enforces the same keys.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{
    AssignedCourse, AssignmentStatus, CourseOwnerContact, FeedbackEntry, FileOwnerContact,
    PendingFeedback, ReviewRequest, ReviewTopic,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not connect to the database: {0}")]
    Connection(#[from] diesel::result::ConnectionError),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Mutations return the number of affected rows; zero means nothing matched.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    async fn assigned_courses(&self, reviewer_id: i32) -> Result<Vec<AssignedCourse>, StoreError>;

    async fn pending_requests(&self, reviewer_id: i32) -> Result<Vec<ReviewRequest>, StoreError>;

    async fn assignment_status(
        &self,
        course_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<AssignmentStatus>, StoreError>;

    async fn accept_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError>;

    async fn delete_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError>;

    async fn review_topics(&self, course_id: i32) -> Result<Vec<ReviewTopic>, StoreError>;

    async fn pending_feedback(&self, reviewer_id: i32) -> Result<Vec<PendingFeedback>, StoreError>;

    /// Owning course of a file, `None` if the file does not exist.
    async fn file_course(&self, file_id: i32) -> Result<Option<i32>, StoreError>;

    /// Fails with `StoreError::UniqueViolation` when the reviewer already has
    /// feedback for the file.
    async fn insert_feedback(&self, entry: FeedbackEntry) -> Result<(), StoreError>;

    async fn update_feedback(&self, entry: FeedbackEntry) -> Result<usize, StoreError>;

    async fn course_owner_contact(&self, course_id: i32) -> Result<Option<CourseOwnerContact>, StoreError>;

    async fn file_owner_contact(&self, file_id: i32) -> Result<Option<FileOwnerContact>, StoreError>;

    async fn faculty_email(&self, faculty_id: i32) -> Result<Option<String>, StoreError>;

    /// Reviewer behind an unexpired session token, with the session's expiry.
    async fn session_faculty(&self, token: &str) -> Result<Option<(i32, DateTime<Utc>)>, StoreError>;
}
