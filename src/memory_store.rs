//! In-memory `ReviewStore` for tests.
//!
//! Mirrors the PostgreSQL keys: one assignment per (course, reviewer) and one
//! feedback row per (file, reviewer).

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{
    AssignedCourse, AssignmentStatus, CourseOwnerContact, Feedback, FeedbackEntry,
    FileOwnerContact, PendingFeedback, ReviewRequest, ReviewTopic,
};
use crate::store::{ReviewStore, StoreError};

struct FacultyRow {
    name: String,
    institution: String,
    email: String,
}

struct CourseRow {
    name: String,
    description: Option<String>,
    owner: i32,
}

struct FileRow {
    course_id: i32,
    name: String,
    link: String,
    file_type: String,
    uploaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    faculty: HashMap<i32, FacultyRow>,
    courses: BTreeMap<i32, CourseRow>,
    assignments: BTreeMap<(i32, i32), AssignmentStatus>,
    files: BTreeMap<i32, FileRow>,
    feedback: Vec<Feedback>,
    sessions: HashMap<String, (i32, DateTime<Utc>)>,
}

#[derive(Default)]
pub struct InMemoryReviewStore {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    contact_lookups_unavailable: AtomicBool,
}

fn unavailable() -> StoreError {
    StoreError::Connection(diesel::result::ConnectionError::BadConnection(
        "database unavailable".into(),
    ))
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_faculty(&self, faculty_id: i32, name: &str, email: &str) {
        self.tables.lock().unwrap().faculty.insert(
            faculty_id,
            FacultyRow {
                name: name.to_string(),
                institution: "GJU".to_string(),
                email: email.to_string(),
            },
        );
    }

    pub fn add_course(&self, course_id: i32, name: &str, owner: i32) {
        self.tables.lock().unwrap().courses.insert(
            course_id,
            CourseRow { name: name.to_string(), description: Some(format!("{} description", name)), owner },
        );
    }

    pub fn add_file(&self, file_id: i32, course_id: i32, name: &str) {
        self.tables.lock().unwrap().files.insert(
            file_id,
            FileRow {
                course_id,
                name: name.to_string(),
                link: format!("https://files.example.edu/{}", name),
                file_type: "pdf".to_string(),
                uploaded_at: Utc::now(),
            },
        );
    }

    pub fn assign(&self, course_id: i32, reviewer_id: i32, status: AssignmentStatus) {
        self.tables.lock().unwrap().assignments.insert((course_id, reviewer_id), status);
    }

    pub fn add_session(&self, token: &str, faculty_id: i32, expires_at: DateTime<Utc>) {
        self.tables.lock().unwrap().sessions.insert(token.to_string(), (faculty_id, expires_at));
    }

    pub fn status_of(&self, course_id: i32, reviewer_id: i32) -> Option<AssignmentStatus> {
        self.tables.lock().unwrap().assignments.get(&(course_id, reviewer_id)).copied()
    }

    pub fn feedback_rows(&self, file_id: i32, reviewer_id: i32) -> Vec<Feedback> {
        self.tables
            .lock()
            .unwrap()
            .feedback
            .iter()
            .filter(|row| row.file_id == file_id && row.reviewer_id == reviewer_id)
            .cloned()
            .collect()
    }

    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    /// Only the recipient lookups fail; mutations keep working.
    pub fn set_contact_lookups_unavailable(&self, value: bool) {
        self.contact_lookups_unavailable.store(value, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }

    fn check_lookup(&self) -> Result<(), StoreError> {
        self.check()?;
        if self.contact_lookups_unavailable.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for InMemoryReviewStore {
    async fn assigned_courses(&self, reviewer_id: i32) -> Result<Vec<AssignedCourse>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut result = Vec::new();
        for (course_id, _) in tables.assignments.keys().filter(|(_, r)| *r == reviewer_id) {
            let Some(course) = tables.courses.get(course_id) else { continue };
            let file_ids: Vec<i32> = tables
                .files
                .iter()
                .filter(|(_, file)| file.course_id == *course_id)
                .map(|(id, _)| *id)
                .collect();
            let without = file_ids
                .iter()
                .filter(|id| !tables.feedback.iter().any(|row| row.file_id == **id))
                .count();
            result.push(AssignedCourse {
                course_id: *course_id,
                course_name: course.name.clone(),
                total_files: file_ids.len() as i64,
                files_without_feedback: without as i64,
            });
        }
        Ok(result)
    }

    async fn pending_requests(&self, reviewer_id: i32) -> Result<Vec<ReviewRequest>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut result = Vec::new();
        for ((course_id, r), status) in tables.assignments.iter() {
            if *r != reviewer_id || *status != AssignmentStatus::Pending {
                continue;
            }
            let Some(course) = tables.courses.get(course_id) else { continue };
            let Some(owner) = tables.faculty.get(&course.owner) else { continue };
            result.push(ReviewRequest {
                course_id: *course_id,
                course_name: course.name.clone(),
                course_description: course.description.clone(),
                faculty_name: owner.name.clone(),
                faculty_institution: owner.institution.clone(),
            });
        }
        Ok(result)
    }

    async fn assignment_status(
        &self,
        course_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<AssignmentStatus>, StoreError> {
        self.check()?;
        Ok(self.status_of(course_id, reviewer_id))
    }

    async fn accept_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        match tables.assignments.get_mut(&(course_id, reviewer_id)) {
            Some(status) => {
                *status = AssignmentStatus::Accepted;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        Ok(tables.assignments.remove(&(course_id, reviewer_id)).map_or(0, |_| 1))
    }

    async fn review_topics(&self, course_id: i32) -> Result<Vec<ReviewTopic>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .files
            .iter()
            .filter(|(_, file)| file.course_id == course_id)
            .map(|(file_id, file)| ReviewTopic {
                file_id: *file_id,
                file_name: file.name.clone(),
                file_link: file.link.clone(),
                file_type: file.file_type.clone(),
                uploaded_at: file.uploaded_at,
                has_feedback: tables.feedback.iter().any(|row| row.file_id == *file_id),
            })
            .collect())
    }

    async fn pending_feedback(&self, reviewer_id: i32) -> Result<Vec<PendingFeedback>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        let mut result = Vec::new();
        for (course_id, _) in tables.assignments.keys().filter(|(_, r)| *r == reviewer_id) {
            let Some(course) = tables.courses.get(course_id) else { continue };
            for (file_id, file) in tables.files.iter().filter(|(_, f)| f.course_id == *course_id) {
                let reviewed = tables
                    .feedback
                    .iter()
                    .any(|row| row.file_id == *file_id && row.reviewer_id == reviewer_id);
                if !reviewed {
                    result.push(PendingFeedback {
                        file_id: *file_id,
                        course_name: course.name.clone(),
                        file_name: file.name.clone(),
                        file_link: file.link.clone(),
                    });
                }
            }
        }
        Ok(result)
    }

    async fn file_course(&self, file_id: i32) -> Result<Option<i32>, StoreError> {
        self.check()?;
        Ok(self.tables.lock().unwrap().files.get(&file_id).map(|file| file.course_id))
    }

    async fn insert_feedback(&self, entry: FeedbackEntry) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let exists = tables
            .feedback
            .iter()
            .any(|row| row.file_id == entry.file_id && row.reviewer_id == entry.reviewer_id);
        if exists {
            return Err(StoreError::UniqueViolation(
                "duplicate key value violates unique constraint \"feedback_file_reviewer_idx\"".to_string(),
            ));
        }
        tables.feedback.push(entry.into_new_row());
        Ok(())
    }

    async fn update_feedback(&self, entry: FeedbackEntry) -> Result<usize, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let mut updated = 0;
        for row in tables.feedback.iter_mut().filter(|row| {
            row.file_id == entry.file_id
                && row.reviewer_id == entry.reviewer_id
                && row.course_id == entry.course_id
        }) {
            row.feedback_text = entry.feedback_text.clone();
            row.quality = entry.quality.clone();
            row.rating = entry.rating;
            updated += 1;
        }
        Ok(updated)
    }

    async fn course_owner_contact(&self, course_id: i32) -> Result<Option<CourseOwnerContact>, StoreError> {
        self.check_lookup()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.courses.get(&course_id).and_then(|course| {
            tables.faculty.get(&course.owner).map(|owner| CourseOwnerContact {
                email: owner.email.clone(),
                course_name: course.name.clone(),
            })
        }))
    }

    async fn file_owner_contact(&self, file_id: i32) -> Result<Option<FileOwnerContact>, StoreError> {
        self.check_lookup()?;
        let tables = self.tables.lock().unwrap();
        let Some(file) = tables.files.get(&file_id) else { return Ok(None) };
        let Some(course) = tables.courses.get(&file.course_id) else { return Ok(None) };
        Ok(tables.faculty.get(&course.owner).map(|owner| FileOwnerContact {
            email: owner.email.clone(),
            course_name: course.name.clone(),
            file_name: file.name.clone(),
        }))
    }

    async fn faculty_email(&self, faculty_id: i32) -> Result<Option<String>, StoreError> {
        self.check_lookup()?;
        Ok(self.tables.lock().unwrap().faculty.get(&faculty_id).map(|f| f.email.clone()))
    }

    async fn session_faculty(&self, token: &str) -> Result<Option<(i32, DateTime<Utc>)>, StoreError> {
        self.check()?;
        let now = Utc::now();
        Ok(self
            .tables
            .lock()
            .unwrap()
            .sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .copied())
    }
}
