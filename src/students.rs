use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::sync::Arc;

use crate::auth::Authenticated;
use crate::catalogue::subjects_for;
use crate::engine::within;
use crate::err::{Created, Error};
use crate::models::{Email, NewStudent, StudentRecord, PAID, UNPAID};
use crate::planner::UpdateRequest;
use crate::renewal::is_active;
use crate::{breaks, proceeds, AppState, Payload};

pub async fn update_student(
    Authenticated(principal): Authenticated,
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> Payload<Message> {
    let Json(request) = payload?;
    state
        .engine
        .update_student(&principal, &request, Utc::now())
        .await?;
    proceeds(Message::new("Student updated successfully"))
}

pub async fn register_student(
    Authenticated(principal): Authenticated,
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<RegisterStudent>, JsonRejection>,
) -> Payload<CreatedStudent> {
    let Json(body) = payload?;
    let email = match Email::parse(&body.email) {
        Some(email) => email,
        None => return breaks(Error::invalid("Missing required field: 'email'")),
    };
    let student = NewStudent {
        email,
        name: non_empty(body.name),
        phone_number: non_empty(body.phone_number),
        student_class: non_empty(body.student_class),
    };

    let created = within(
        state.engine.deadline(),
        state.store.insert_student(&student),
    )
    .await?;
    match created {
        Some(student) => {
            log::info!("Student {} registered by {}", student.email, principal.email);
            Ok(Created(CreatedStudent {
                message: "Student created successfully",
                student,
            }))
        }
        None => breaks(Error::Conflict {
            message: "Student already exists".to_string(),
        }),
    }
}

pub async fn get_student(
    Authenticated(principal): Authenticated,
    Extension(state): Extension<Arc<AppState>>,
    query: Result<Query<StudentQuery>, QueryRejection>,
) -> Payload<StudentView> {
    let Query(query) = query?;
    let email = match query.email.as_deref().and_then(Email::parse) {
        Some(email) => email,
        None => return breaks(Error::invalid("Missing 'email' query parameter")),
    };

    let deadline = state.engine.deadline();
    if principal.email != email {
        let role = within(deadline, state.engine.gate().role_of(&principal.email)).await?;
        if !role.is_staff() {
            log::warn!("{} may not read student {}", principal.email, email);
            return breaks(Error::Forbidden {
                message: "Not authorized to read this student".to_string(),
            });
        }
    }

    let student = within(deadline, state.store.find_student(&email)).await?;
    match student {
        Some(student) => proceeds(StudentView::of(student)),
        None => breaks(Error::NotFound {
            message: "Student not found".to_string(),
        }),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    message: &'static str,
}

impl Message {
    pub fn new(message: &'static str) -> Self {
        Message { message }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudent {
    #[serde(default)]
    pub email: String,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub student_class: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedStudent {
    message: &'static str,
    student: StudentRecord,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentQuery {
    pub email: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    #[serde(flatten)]
    pub student: StudentRecord,
    pub payment_status: &'static str,
    pub subjects: Option<Vec<&'static str>>,
}

impl StudentView {
    pub fn of(student: StudentRecord) -> Self {
        let today = Utc::now().date_naive();
        let payment_status = if is_active(student.sub_exp_date, today) {
            PAID
        } else {
            UNPAID
        };
        let subjects = student.student_class.as_deref().map(subjects_for);
        StudentView {
            student,
            payment_status,
            subjects,
        }
    }
}
