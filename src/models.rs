use crate::schema::feedback;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Bool, Integer, Nullable, Text, Timestamptz, Varchar};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status column of `course_reviewers`. Declined assignments are deleted, so
/// there is no terminal "declined" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Pending,
    Accepted,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Accepted => "accepted",
        }
    }

    pub fn from_column(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AssignmentStatus::Pending),
            "accepted" => Some(AssignmentStatus::Accepted),
            _ => None,
        }
    }
}

#[derive(QueryableByName, Serialize, Debug, Clone, PartialEq)]
pub struct AssignedCourse {
    #[diesel(sql_type = Integer)]
    #[serde(rename = "CID")]
    pub course_id: i32,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "Course_name")]
    pub course_name: String,

    #[diesel(sql_type = BigInt)]
    pub total_files: i64,

    #[diesel(sql_type = BigInt)]
    pub files_without_feedback: i64,
}

#[derive(QueryableByName, Serialize, Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    #[diesel(sql_type = Integer)]
    #[serde(rename = "CID")]
    pub course_id: i32,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "Course_name")]
    pub course_name: String,

    #[diesel(sql_type = Nullable<Text>)]
    #[serde(rename = "Course_description")]
    pub course_description: Option<String>,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "Faculty_Name")]
    pub faculty_name: String,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "Faculty_Institution")]
    pub faculty_institution: String,
}

/// A file the reviewer is linked to through a course but has not reviewed yet.
#[derive(QueryableByName, Serialize, Debug, Clone, PartialEq)]
pub struct PendingFeedback {
    #[diesel(sql_type = Integer)]
    #[serde(rename = "File_id")]
    pub file_id: i32,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "Course_Name")]
    pub course_name: String,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "File_name")]
    pub file_name: String,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "File_link")]
    pub file_link: String,
}

/// A course file with a course-wide completion flag (feedback from anyone).
#[derive(QueryableByName, Serialize, Debug, Clone, PartialEq)]
pub struct ReviewTopic {
    #[diesel(sql_type = Integer)]
    #[serde(rename = "File_id")]
    pub file_id: i32,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "File_name")]
    pub file_name: String,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "File_link")]
    pub file_link: String,

    #[diesel(sql_type = Varchar)]
    #[serde(rename = "File_type")]
    pub file_type: String,

    #[diesel(sql_type = Timestamptz)]
    #[serde(rename = "Uploaded_at")]
    pub uploaded_at: chrono::DateTime<Utc>,

    #[diesel(sql_type = Bool)]
    pub has_feedback: bool,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = feedback)]
pub struct Feedback {
    pub feedback_id: Uuid,
    pub file_id: i32,
    pub reviewer_id: i32,
    pub course_id: i32,
    pub feedback_text: String,
    pub quality: String,

    pub rating: i32, /* 1 - 5 */
    pub submitted_at: chrono::DateTime<Utc>,
}

/// What a reviewer sends for one file, on both submit and edit.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEntry {
    pub file_id: i32,
    pub reviewer_id: i32,
    pub course_id: i32,
    pub feedback_text: String,
    pub quality: String,
    pub rating: i32,
}

impl FeedbackEntry {
    pub fn into_new_row(self) -> Feedback {
        Feedback {
            feedback_id: Uuid::new_v4(),
            file_id: self.file_id,
            reviewer_id: self.reviewer_id,
            course_id: self.course_id,
            feedback_text: self.feedback_text,
            quality: self.quality,
            rating: self.rating,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseOwnerContact {
    pub email: String,
    pub course_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOwnerContact {
    pub email: String,
    pub course_name: String,
    pub file_name: String,
}

#[derive(Deserialize, Debug)]
pub struct RespondToRequestBody {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize, Debug)]
pub struct FeedbackBody {
    #[serde(rename = "CID")]
    pub course_id: i32,
    pub feedback: String,
    pub quality: String,
    pub rating: i32,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}
