//! Review workflow: the use cases the HTTP layer exposes.
//!
//! Every mutation runs to completion first. Only once it has succeeded are the
//! recipients looked up and mailed, each on its own spawned task that the
//! response path never awaits. Failures on that path are logged and, when a
//! sender is attached, reported through `NotificationFailure`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::assignments::{AssignmentManager, ReviewDecision};
use crate::error::ReviewError;
use crate::feedback::FeedbackLedger;
use crate::models::{
    AssignedCourse, AssignmentStatus, FeedbackEntry, PendingFeedback, ReviewRequest, ReviewTopic,
};
use crate::notifier::{
    escape_html, Email, NotificationError, Notifier, SUBJECT_FEEDBACK_SUBMITTED,
    SUBJECT_FEEDBACK_UPDATED, SUBJECT_REVIEWER_ASSIGNED,
};
use crate::store::ReviewStore;

/// One email to send after a committed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// To the course owner.
    ReviewerAccepted { course_id: i32 },
    /// To the owner of the file that received feedback.
    FeedbackForOwner { file_id: i32, updated: bool },
    /// Confirmation to the reviewer who wrote the feedback.
    FeedbackForReviewer { reviewer_id: i32, updated: bool },
}

impl Notice {
    async fn compose(&self, store: &dyn ReviewStore) -> Result<Email, NotificationError> {
        match *self {
            Notice::ReviewerAccepted { course_id } => {
                let contact = store
                    .course_owner_contact(course_id)
                    .await?
                    .ok_or_else(|| NotificationError::MissingRecipient(format!("course {}", course_id)))?;
                Ok(Email {
                    to: contact.email,
                    subject: SUBJECT_REVIEWER_ASSIGNED.to_string(),
                    html: format!(
                        "<p>A reviewer has accepted to review your course {}</p>\
                         <p>You can get more details on our platform</p>",
                        escape_html(&contact.course_name)
                    ),
                })
            }
            Notice::FeedbackForOwner { file_id, updated } => {
                let contact = store
                    .file_owner_contact(file_id)
                    .await?
                    .ok_or_else(|| NotificationError::MissingRecipient(format!("file {}", file_id)))?;
                let (file_name, course_name) =
                    (escape_html(&contact.file_name), escape_html(&contact.course_name));
                let (subject, html) = if updated {
                    (
                        SUBJECT_FEEDBACK_UPDATED,
                        format!(
                            "<p>Feedback was just updated for your topic {} under course {}.</p>",
                            file_name, course_name
                        ),
                    )
                } else {
                    (
                        SUBJECT_FEEDBACK_SUBMITTED,
                        format!(
                            "<p>You have just received feedback for your topic {} under course {}.</p>\
                             <p>Please login to your account to view it.</p>",
                            file_name, course_name
                        ),
                    )
                };
                Ok(Email { to: contact.email, subject: subject.to_string(), html })
            }
            Notice::FeedbackForReviewer { reviewer_id, updated } => {
                let email = store
                    .faculty_email(reviewer_id)
                    .await?
                    .ok_or_else(|| NotificationError::MissingRecipient(format!("faculty {}", reviewer_id)))?;
                let (subject, verb) = if updated {
                    (SUBJECT_FEEDBACK_UPDATED, "updated")
                } else {
                    (SUBJECT_FEEDBACK_SUBMITTED, "submitted")
                };
                Ok(Email {
                    to: email,
                    subject: subject.to_string(),
                    html: format!(
                        "<p>You have successfully {} feedback for a topic you have been assigned to.</p>",
                        verb
                    ),
                })
            }
        }
    }
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub notice: Notice,
    pub error: NotificationError,
}

async fn deliver(
    store: &dyn ReviewStore,
    notifier: &dyn Notifier,
    notice: Notice,
) -> Result<(), NotificationError> {
    let email = notice.compose(store).await?;
    email.check_recipient()?;
    notifier.send(email).await
}

pub struct ReviewWorkflow {
    assignments: AssignmentManager,
    ledger: FeedbackLedger,
    store: Arc<dyn ReviewStore>,
    notifier: Arc<dyn Notifier>,
    failures: Option<mpsc::UnboundedSender<NotificationFailure>>,
}

impl ReviewWorkflow {
    pub fn new(store: Arc<dyn ReviewStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            assignments: AssignmentManager::new(store.clone()),
            ledger: FeedbackLedger::new(store.clone()),
            store,
            notifier,
            failures: None,
        }
    }

    pub fn with_failure_reports(mut self, failures: mpsc::UnboundedSender<NotificationFailure>) -> Self {
        self.failures = Some(failures);
        self
    }

    pub async fn courses_to_review(&self, reviewer_id: i32) -> Result<Vec<AssignedCourse>, ReviewError> {
        self.assignments.list_assigned_courses(reviewer_id).await
    }

    pub async fn review_requests(&self, reviewer_id: i32) -> Result<Vec<ReviewRequest>, ReviewError> {
        self.assignments.list_pending_requests(reviewer_id).await
    }

    /// `status` is the raw value from the request body; anything other than
    /// "accepted" or "declined" is rejected before the store is touched.
    pub async fn respond_to_request(
        &self,
        course_id: i32,
        reviewer_id: i32,
        status: &str,
    ) -> Result<ReviewDecision, ReviewError> {
        let decision: ReviewDecision = status.parse()?;
        self.assignments.respond(course_id, reviewer_id, decision).await?;

        if decision == ReviewDecision::Accepted {
            self.dispatch(Notice::ReviewerAccepted { course_id });
        }
        Ok(decision)
    }

    pub async fn pending_feedback(&self, reviewer_id: i32) -> Result<Vec<PendingFeedback>, ReviewError> {
        self.ledger.list_pending_feedback(reviewer_id).await
    }

    pub async fn review_topics(&self, course_id: i32) -> Result<Vec<ReviewTopic>, ReviewError> {
        self.ledger.list_review_topics(course_id).await
    }

    /// The file must belong to the named course and the reviewer must have
    /// accepted the assignment for it.
    pub async fn submit_feedback(&self, entry: FeedbackEntry) -> Result<(), ReviewError> {
        match self.store.file_course(entry.file_id).await? {
            None => return Err(ReviewError::NotFound("File")),
            Some(course_id) if course_id != entry.course_id => {
                return Err(ReviewError::InvalidInput(
                    "File does not belong to this course".to_string(),
                ))
            }
            Some(_) => {}
        }

        let status = self.store.assignment_status(entry.course_id, entry.reviewer_id).await?;
        if status != Some(AssignmentStatus::Accepted) {
            return Err(ReviewError::NotAccepted);
        }

        let (file_id, reviewer_id) = (entry.file_id, entry.reviewer_id);
        self.ledger.submit(entry).await?;

        self.dispatch(Notice::FeedbackForOwner { file_id, updated: false });
        self.dispatch(Notice::FeedbackForReviewer { reviewer_id, updated: false });
        Ok(())
    }

    pub async fn edit_feedback(&self, entry: FeedbackEntry) -> Result<(), ReviewError> {
        let (file_id, reviewer_id) = (entry.file_id, entry.reviewer_id);
        self.ledger.edit(entry).await?;

        self.dispatch(Notice::FeedbackForReviewer { reviewer_id, updated: true });
        self.dispatch(Notice::FeedbackForOwner { file_id, updated: true });
        Ok(())
    }

    fn dispatch(&self, notice: Notice) {
        let store = self.store.clone();
        let notifier = self.notifier.clone();
        let failures = self.failures.clone();

        tokio::spawn(async move {
            match deliver(store.as_ref(), notifier.as_ref(), notice).await {
                Ok(()) => tracing::debug!(?notice, "notification sent"),
                Err(error) => {
                    tracing::warn!(?notice, %error, "notification failed");
                    if let Some(failures) = failures {
                        let _ = failures.send(NotificationFailure { notice, error });
                    }
                }
            }
        });
    }
}
