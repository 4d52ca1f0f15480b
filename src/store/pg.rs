use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};

use crate::config::DatabaseConfig;
use crate::models::{BillingSnapshot, Email, NewStudent, StudentRecord};
use crate::planner::{ColumnValue, UpdatePlan};
use crate::store::{PlanFn, StoreError, StudentStore};

const STUDENT_COLUMNS: &str = "id, email, name, student_class, phone_number, sub_exp_date, \
     updated_by, amount, payment_time, role, payment_status";

#[derive(Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect_with(config.connect.clone())
            .await?;
        Ok(PgStudentStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Any unique index may reject the row, the case-insensitive one included.
fn insert_sql() -> String {
    format!(
        "INSERT INTO students (email, name, phone_number, student_class) \
         VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING RETURNING {}",
        STUDENT_COLUMNS
    )
}

/// Renders `UPDATE students SET ... WHERE LOWER(email) = $n` with every value bound.
fn build_update<'a>(email: &'a Email, plan: &'a UpdatePlan) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::new("UPDATE students SET ");
    for (i, assignment) in plan.assignments.iter().enumerate() {
        if i > 0 {
            query.push(", ");
        }
        query.push(assignment.column.as_str()).push(" = ");
        match &assignment.value {
            ColumnValue::Text(value) => query.push_bind(value.as_str()),
            ColumnValue::Amount(value) => query.push_bind(*value),
            ColumnValue::Date(value) => query.push_bind(*value),
            ColumnValue::Timestamp(value) => query.push_bind(*value),
        };
    }
    query.push(" WHERE LOWER(email) = ").push_bind(email.as_str());
    query
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn role_of(&self, email: &Email) -> Result<Option<String>, StoreError> {
        let role = sqlx::query_scalar::<_, Option<String>>(
            "SELECT role FROM students WHERE LOWER(email) = $1 LIMIT 1",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(role.flatten())
    }

    async fn find_student(&self, email: &Email) -> Result<Option<StudentRecord>, StoreError> {
        let student = sqlx::query_as::<_, StudentRecord>(&format!(
            "SELECT {} FROM students WHERE LOWER(email) = $1 LIMIT 1",
            STUDENT_COLUMNS
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(student)
    }

    async fn insert_student(
        &self,
        student: &NewStudent,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let created = sqlx::query_as::<_, StudentRecord>(&insert_sql())
        .bind(student.email.as_str())
        .bind(&student.name)
        .bind(&student.phone_number)
        .bind(&student.student_class)
        .fetch_optional(&self.pool)
        .await?;
        Ok(created)
    }

    async fn apply_update(&self, email: &Email, planner: &PlanFn<'_>) -> Result<u64, StoreError> {
        // Dropping `tx` on any early return rolls the transaction back.
        let mut tx = self.pool.begin().await?;

        let snapshot = sqlx::query_as::<_, BillingSnapshot>(
            "SELECT sub_exp_date, payment_status FROM students \
             WHERE LOWER(email) = $1 FOR UPDATE",
        )
        .bind(email.as_str())
        .fetch_optional(&mut tx)
        .await?;

        let snapshot = match snapshot {
            Some(snapshot) => snapshot,
            None => {
                log::info!("No student row for {}, nothing to update", email);
                return Ok(0);
            }
        };
        log::debug!(
            "Locked {} (sub_exp_date = {:?}, payment_status = {:?})",
            email,
            snapshot.sub_exp_date,
            snapshot.payment_status
        );

        let plan = planner(&snapshot)?;
        let mut query = build_update(email, &plan);
        log::debug!("Executing query: {}", query.sql());

        let result = query.build().execute(&mut tx).await?;
        tx.commit().await?;

        log::info!(
            "Successfully updated {} row(s) for {}",
            result.rows_affected(),
            email
        );
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{Planner, RenewalTrigger, UpdateRequest};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[test]
    fn update_sql_binds_every_value() {
        let email = Email::parse("Kid@School.org").unwrap();
        let mut req = UpdateRequest::new(email.clone());
        req.name = Some("Kid'; DROP TABLE students; --".into());
        req.amount = Some(900.0);
        req.updated_by = Some("office@school.org".into());
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let snapshot = BillingSnapshot {
            sub_exp_date: NaiveDate::from_ymd_opt(2024, 7, 1),
            payment_status: None,
        };
        let plan = Planner::new(RenewalTrigger::Amount, now)
            .plan(&snapshot, &req)
            .unwrap();

        let query = build_update(&email, &plan);
        assert_eq!(
            query.sql(),
            "UPDATE students SET name = $1, amount = $2, payment_time = $3, \
             sub_exp_date = $4, updated_by = $5 WHERE LOWER(email) = $6"
        );
    }

    #[test]
    fn single_assignment_sql() {
        let email = Email::parse("a@b.io").unwrap();
        let mut req = UpdateRequest::new(email.clone());
        req.student_class = Some("CLS8".into());
        let plan = Planner::new(RenewalTrigger::Amount, Utc::now())
            .plan(&BillingSnapshot::default(), &req)
            .unwrap();
        let query = build_update(&email, &plan);
        assert_eq!(
            query.sql(),
            "UPDATE students SET student_class = $1 WHERE LOWER(email) = $2"
        );
    }

    #[test]
    fn insert_yields_on_any_unique_conflict() {
        let sql = insert_sql();
        assert!(sql.contains("ON CONFLICT DO NOTHING RETURNING id, email"), "{}", sql);
    }
}
