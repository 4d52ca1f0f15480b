//! Persistence seam for student records.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::{BillingSnapshot, Email, NewStudent, StudentRecord};
use crate::planner::{PlanError, UpdatePlan};

#[cfg(test)]
pub mod memory;
pub mod pg;

pub use pg::PgStudentStore;

/// Plans an update from the row's billing snapshot, called under the row lock.
pub type PlanFn<'a> = dyn Fn(&BillingSnapshot) -> Result<UpdatePlan, PlanError> + Send + Sync + 'a;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store call did not finish within {0:?}")]
    Timeout(Duration),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Database(_) => "DatabaseError",
            StoreError::Timeout(_) => "Timeout",
            StoreError::Unavailable(_) => "StoreUnavailable",
            StoreError::Plan(_) => "PlanError",
        }
    }
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    /// Raw role tag of the student with this email; `None` when the row or the tag is missing.
    async fn role_of(&self, email: &Email) -> Result<Option<String>, StoreError>;

    async fn find_student(&self, email: &Email) -> Result<Option<StudentRecord>, StoreError>;

    /// Inserts a new student. Returns `None` when the email is already registered.
    async fn insert_student(
        &self,
        student: &NewStudent,
    ) -> Result<Option<StudentRecord>, StoreError>;

    /// Locks the row, plans against its billing snapshot and writes the plan
    /// atomically. Returns the number of rows changed; `0` when no student
    /// has this email, in which case nothing is planned or written.
    async fn apply_update(&self, email: &Email, planner: &PlanFn<'_>) -> Result<u64, StoreError>;
}
