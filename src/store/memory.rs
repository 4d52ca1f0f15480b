//! In-memory [`StudentStore`] used by the unit and router tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::models::{BillingSnapshot, Email, NewStudent, StudentRecord};
use crate::planner::{Column, ColumnValue};
use crate::store::{PlanFn, StoreError, StudentStore};

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, StudentRecord>>,
    next_id: AtomicI32,
    writes: AtomicUsize,
    failure: Mutex<Option<String>>,
    update_failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
}

pub fn blank_student(email: &str) -> StudentRecord {
    StudentRecord {
        id: 0,
        email: email.to_lowercase(),
        name: None,
        student_class: None,
        phone_number: None,
        sub_exp_date: None,
        updated_by: None,
        amount: None,
        payment_time: None,
        role: None,
        payment_status: None,
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, mut record: StudentRecord) {
        record.email = record.email.to_lowercase();
        record.id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.rows
            .lock()
            .unwrap()
            .insert(record.email.clone(), record);
    }

    pub fn insert_with_role(&self, email: &str, role: Option<&str>) {
        let mut record = blank_student(email);
        record.role = role.map(str::to_string);
        self.put(record);
    }

    pub fn insert_with_expiry(&self, email: &str, expiry: Option<NaiveDate>) {
        let mut record = blank_student(email);
        record.sub_exp_date = expiry;
        self.put(record);
    }

    pub fn get(&self, email: &str) -> Option<StudentRecord> {
        self.rows.lock().unwrap().get(&email.to_lowercase()).cloned()
    }

    /// Number of committed writes (inserts and updates).
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next store call fail with an infrastructure error.
    pub fn fail_next(&self, reason: &str) {
        *self.failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Makes every `apply_update` fail after the row is found.
    pub fn fail_updates(&self, reason: &str) {
        *self.update_failure.lock().unwrap() = Some(reason.to_string());
    }

    pub fn delay_calls(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.failure.lock().unwrap().take() {
            Some(reason) => Err(StoreError::Unavailable(reason)),
            None => Ok(()),
        }
    }
}

fn apply(record: &mut StudentRecord, column: Column, value: &ColumnValue) {
    let text = |value: &ColumnValue| match value {
        ColumnValue::Text(text) => Some(text.clone()),
        _ => None,
    };
    match (column, value) {
        (Column::Name, v) => record.name = text(v),
        (Column::PhoneNumber, v) => record.phone_number = text(v),
        (Column::StudentClass, v) => record.student_class = text(v),
        (Column::PaymentStatus, v) => record.payment_status = text(v),
        (Column::UpdatedBy, v) => record.updated_by = text(v),
        (Column::Amount, ColumnValue::Amount(amount)) => record.amount = Some(*amount),
        (Column::SubExpDate, ColumnValue::Date(date)) => record.sub_exp_date = Some(*date),
        (Column::PaymentTime, ColumnValue::Timestamp(at)) => record.payment_time = Some(*at),
        (column, value) => panic!("{:?} cannot hold {:?}", column, value),
    }
}

#[async_trait]
impl StudentStore for MemoryStore {
    async fn role_of(&self, email: &Email) -> Result<Option<String>, StoreError> {
        self.enter().await?;
        Ok(self.get(email.as_str()).and_then(|r| r.role))
    }

    async fn find_student(&self, email: &Email) -> Result<Option<StudentRecord>, StoreError> {
        self.enter().await?;
        Ok(self.get(email.as_str()))
    }

    async fn insert_student(
        &self,
        student: &NewStudent,
    ) -> Result<Option<StudentRecord>, StoreError> {
        self.enter().await?;
        if self.get(student.email.as_str()).is_some() {
            return Ok(None);
        }
        let mut record = blank_student(student.email.as_str());
        record.name = student.name.clone();
        record.phone_number = student.phone_number.clone();
        record.student_class = student.student_class.clone();
        self.put(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(student.email.as_str()))
    }

    async fn apply_update(&self, email: &Email, planner: &PlanFn<'_>) -> Result<u64, StoreError> {
        self.enter().await?;
        let mut rows = self.rows.lock().unwrap();
        let current = match rows.get(email.as_str()) {
            Some(current) => current,
            None => return Ok(0),
        };
        let snapshot = BillingSnapshot {
            sub_exp_date: current.sub_exp_date,
            payment_status: current.payment_status.clone(),
        };
        let plan = planner(&snapshot)?;
        if let Some(reason) = self.update_failure.lock().unwrap().clone() {
            return Err(StoreError::Unavailable(reason));
        }
        let mut updated = current.clone();
        for assignment in &plan.assignments {
            apply(&mut updated, assignment.column, &assignment.value);
        }
        rows.insert(email.as_str().to_string(), updated);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    }
}
