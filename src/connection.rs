use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::Integer;
use diesel::{Connection, PgConnection};

use crate::models::{
    AssignedCourse, AssignmentStatus, CourseOwnerContact, FeedbackEntry, FileOwnerContact,
    PendingFeedback, ReviewRequest, ReviewTopic,
};
use crate::schema::{course_reviewers, courses, faculty, feedback, files, sessions};
use crate::store::{ReviewStore, StoreError};

// Every linked course, including those without files. Files are counted once
// each, so several feedback rows on one file don't inflate the totals.
const ASSIGNED_COURSES_SQL: &str = "
    SELECT
        c.course_id,
        c.course_name,
        COUNT(f.file_id) AS total_files,
        COUNT(f.file_id) FILTER (
            WHERE NOT EXISTS (SELECT 1 FROM feedback fb WHERE fb.file_id = f.file_id)
        ) AS files_without_feedback
    FROM course_reviewers cr
    JOIN courses c ON c.course_id = cr.course_id
    LEFT JOIN files f ON f.course_id = c.course_id
    WHERE cr.faculty_id = $1
    GROUP BY c.course_id, c.course_name
    ORDER BY c.course_id";

const PENDING_REQUESTS_SQL: &str = "
    SELECT
        c.course_id,
        c.course_name,
        c.course_description,
        f.faculty_name,
        f.faculty_institution
    FROM course_reviewers cr
    JOIN courses c ON c.course_id = cr.course_id
    JOIN faculty f ON f.faculty_id = c.faculty_id
    WHERE cr.faculty_id = $1 AND cr.status = 'pending'
    ORDER BY c.course_id";

const REVIEW_TOPICS_SQL: &str = "
    SELECT
        f.file_id,
        f.file_name,
        f.file_link,
        f.file_type,
        f.uploaded_at,
        EXISTS (SELECT 1 FROM feedback fb WHERE fb.file_id = f.file_id) AS has_feedback
    FROM files f
    WHERE f.course_id = $1
    ORDER BY f.file_id";

// Anti-join against this reviewer's own feedback only.
const PENDING_FEEDBACK_SQL: &str = "
    SELECT
        fi.file_id,
        c.course_name,
        fi.file_name,
        fi.file_link
    FROM course_reviewers cr
    JOIN courses c ON c.course_id = cr.course_id
    JOIN files fi ON fi.course_id = c.course_id
    LEFT JOIN feedback fb ON fb.file_id = fi.file_id AND fb.reviewer_id = cr.faculty_id
    WHERE cr.faculty_id = $1 AND fb.feedback_id IS NULL
    ORDER BY c.course_id, fi.file_id";

pub fn establish_connection(db_url: &str) -> Result<PgConnection, diesel::result::ConnectionError> {
    PgConnection::establish(db_url)
}

fn translate_insert_error(error: DieselError) -> StoreError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            StoreError::UniqueViolation(info.message().to_string())
        }
        other => StoreError::Query(other),
    }
}

/// Blocking queries, one function per store operation, all on a borrowed
/// connection so they can also run inside a test transaction.
mod queries {
    use super::*;

    pub fn assigned_courses(conn: &mut PgConnection, reviewer_id: i32) -> Result<Vec<AssignedCourse>, StoreError> {
        Ok(diesel::sql_query(ASSIGNED_COURSES_SQL)
            .bind::<Integer, _>(reviewer_id)
            .load::<AssignedCourse>(conn)?)
    }

    pub fn pending_requests(conn: &mut PgConnection, reviewer_id: i32) -> Result<Vec<ReviewRequest>, StoreError> {
        Ok(diesel::sql_query(PENDING_REQUESTS_SQL)
            .bind::<Integer, _>(reviewer_id)
            .load::<ReviewRequest>(conn)?)
    }

    pub fn assignment_status(
        conn: &mut PgConnection,
        course_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<AssignmentStatus>, StoreError> {
        let status = course_reviewers::table
            .find((course_id, reviewer_id))
            .select(course_reviewers::status)
            .first::<String>(conn)
            .optional()?;
        Ok(status.and_then(|s| AssignmentStatus::from_column(&s)))
    }

    pub fn accept_assignment(conn: &mut PgConnection, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        let target = course_reviewers::table
            .filter(course_reviewers::course_id.eq(course_id))
            .filter(course_reviewers::faculty_id.eq(reviewer_id));
        Ok(diesel::update(target)
            .set(course_reviewers::status.eq(AssignmentStatus::Accepted.as_str()))
            .execute(conn)?)
    }

    pub fn delete_assignment(conn: &mut PgConnection, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        let target = course_reviewers::table
            .filter(course_reviewers::course_id.eq(course_id))
            .filter(course_reviewers::faculty_id.eq(reviewer_id));
        Ok(diesel::delete(target).execute(conn)?)
    }

    pub fn review_topics(conn: &mut PgConnection, course_id: i32) -> Result<Vec<ReviewTopic>, StoreError> {
        Ok(diesel::sql_query(REVIEW_TOPICS_SQL)
            .bind::<Integer, _>(course_id)
            .load::<ReviewTopic>(conn)?)
    }

    pub fn pending_feedback(conn: &mut PgConnection, reviewer_id: i32) -> Result<Vec<PendingFeedback>, StoreError> {
        Ok(diesel::sql_query(PENDING_FEEDBACK_SQL)
            .bind::<Integer, _>(reviewer_id)
            .load::<PendingFeedback>(conn)?)
    }

    pub fn file_course(conn: &mut PgConnection, file_id: i32) -> Result<Option<i32>, StoreError> {
        Ok(files::table
            .find(file_id)
            .select(files::course_id)
            .first::<i32>(conn)
            .optional()?)
    }

    pub fn insert_feedback(conn: &mut PgConnection, entry: FeedbackEntry) -> Result<(), StoreError> {
        diesel::insert_into(feedback::table)
            .values(entry.into_new_row())
            .execute(conn)
            .map_err(translate_insert_error)?;
        Ok(())
    }

    pub fn update_feedback(conn: &mut PgConnection, entry: FeedbackEntry) -> Result<usize, StoreError> {
        let target = feedback::table
            .filter(feedback::file_id.eq(entry.file_id))
            .filter(feedback::reviewer_id.eq(entry.reviewer_id))
            .filter(feedback::course_id.eq(entry.course_id));
        Ok(diesel::update(target)
            .set((
                feedback::feedback_text.eq(entry.feedback_text),
                feedback::quality.eq(entry.quality),
                feedback::rating.eq(entry.rating),
            ))
            .execute(conn)?)
    }

    pub fn course_owner_contact(
        conn: &mut PgConnection,
        course_id: i32,
    ) -> Result<Option<CourseOwnerContact>, StoreError> {
        let contact = courses::table
            .inner_join(faculty::table)
            .filter(courses::course_id.eq(course_id))
            .select((faculty::faculty_email, courses::course_name))
            .first::<(String, String)>(conn)
            .optional()?;
        Ok(contact.map(|(email, course_name)| CourseOwnerContact { email, course_name }))
    }

    pub fn file_owner_contact(conn: &mut PgConnection, file_id: i32) -> Result<Option<FileOwnerContact>, StoreError> {
        let contact = files::table
            .inner_join(courses::table.inner_join(faculty::table))
            .filter(files::file_id.eq(file_id))
            .select((faculty::faculty_email, courses::course_name, files::file_name))
            .first::<(String, String, String)>(conn)
            .optional()?;
        Ok(contact.map(|(email, course_name, file_name)| FileOwnerContact {
            email,
            course_name,
            file_name,
        }))
    }

    pub fn faculty_email(conn: &mut PgConnection, faculty_id: i32) -> Result<Option<String>, StoreError> {
        Ok(faculty::table
            .find(faculty_id)
            .select(faculty::faculty_email)
            .first::<String>(conn)
            .optional()?)
    }

    pub fn session_faculty(
        conn: &mut PgConnection,
        token: &str,
    ) -> Result<Option<(i32, DateTime<Utc>)>, StoreError> {
        Ok(sessions::table
            .filter(sessions::token.eq(token))
            .filter(sessions::expires_at.gt(Utc::now()))
            .select((sessions::faculty_id, sessions::expires_at))
            .first::<(i32, DateTime<Utc>)>(conn)
            .optional()?)
    }
}

/// PostgreSQL backend. Diesel is blocking, so each call opens its own
/// connection on the blocking pool and only suspends the calling request.
#[derive(Clone)]
pub struct PgReviewStore {
    database_url: Arc<str>,
}

impl PgReviewStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self { database_url: Arc::from(database_url.into()) }
    }

    async fn run<T, F>(&self, query: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db_url = self.database_url.clone();
        tokio::task::spawn_blocking(move || {
            let conn = &mut establish_connection(&db_url)?;
            query(conn)
        })
        .await?
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn assigned_courses(&self, reviewer_id: i32) -> Result<Vec<AssignedCourse>, StoreError> {
        self.run(move |conn| queries::assigned_courses(conn, reviewer_id)).await
    }

    async fn pending_requests(&self, reviewer_id: i32) -> Result<Vec<ReviewRequest>, StoreError> {
        self.run(move |conn| queries::pending_requests(conn, reviewer_id)).await
    }

    async fn assignment_status(
        &self,
        course_id: i32,
        reviewer_id: i32,
    ) -> Result<Option<AssignmentStatus>, StoreError> {
        self.run(move |conn| queries::assignment_status(conn, course_id, reviewer_id)).await
    }

    async fn accept_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        self.run(move |conn| queries::accept_assignment(conn, course_id, reviewer_id)).await
    }

    async fn delete_assignment(&self, course_id: i32, reviewer_id: i32) -> Result<usize, StoreError> {
        self.run(move |conn| queries::delete_assignment(conn, course_id, reviewer_id)).await
    }

    async fn review_topics(&self, course_id: i32) -> Result<Vec<ReviewTopic>, StoreError> {
        self.run(move |conn| queries::review_topics(conn, course_id)).await
    }

    async fn pending_feedback(&self, reviewer_id: i32) -> Result<Vec<PendingFeedback>, StoreError> {
        self.run(move |conn| queries::pending_feedback(conn, reviewer_id)).await
    }

    async fn file_course(&self, file_id: i32) -> Result<Option<i32>, StoreError> {
        self.run(move |conn| queries::file_course(conn, file_id)).await
    }

    async fn insert_feedback(&self, entry: FeedbackEntry) -> Result<(), StoreError> {
        self.run(move |conn| queries::insert_feedback(conn, entry)).await
    }

    async fn update_feedback(&self, entry: FeedbackEntry) -> Result<usize, StoreError> {
        self.run(move |conn| queries::update_feedback(conn, entry)).await
    }

    async fn course_owner_contact(&self, course_id: i32) -> Result<Option<CourseOwnerContact>, StoreError> {
        self.run(move |conn| queries::course_owner_contact(conn, course_id)).await
    }

    async fn file_owner_contact(&self, file_id: i32) -> Result<Option<FileOwnerContact>, StoreError> {
        self.run(move |conn| queries::file_owner_contact(conn, file_id)).await
    }

    async fn faculty_email(&self, faculty_id: i32) -> Result<Option<String>, StoreError> {
        self.run(move |conn| queries::faculty_email(conn, faculty_id)).await
    }

    async fn session_faculty(&self, token: &str) -> Result<Option<(i32, DateTime<Utc>)>, StoreError> {
        let token = token.to_owned();
        self.run(move |conn| queries::session_faculty(conn, &token)).await
    }
}
