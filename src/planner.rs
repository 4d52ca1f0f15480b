//! Turns a sparse update request into an ordered list of column assignments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use thiserror::Error;

use crate::models::{canonical_status, is_paid, BillingSnapshot, Email, PAID};
use crate::renewal::renew;

/// Which request field drives a subscription renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalTrigger {
    /// A positive `amount` renews.
    Amount,
    /// A `paymentStatus` moving into `PAID` renews.
    Status,
}

impl RenewalTrigger {
    /// Whether the request carries the billing field this trigger reacts to.
    pub fn carries_billing(self, request: &UpdateRequest) -> bool {
        match self {
            RenewalTrigger::Amount => request.amount.is_some(),
            RenewalTrigger::Status => request.payment_status.is_some(),
        }
    }
}

impl FromStr for RenewalTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amount" => Ok(RenewalTrigger::Amount),
            "status" => Ok(RenewalTrigger::Status),
            other => Err(format!("unknown renewal trigger `{}`", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub email: Email,
    #[serde(default, deserialize_with = "non_empty")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub student_class: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub updated_by: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub payment_status: Option<String>,
}

/// Absent, `null` and `""` all mean "leave the column alone".
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

impl UpdateRequest {
    pub fn new(email: Email) -> Self {
        UpdateRequest {
            email,
            name: None,
            phone_number: None,
            student_class: None,
            amount: None,
            updated_by: None,
            payment_status: None,
        }
    }

    /// True when planning this request can produce at least one assignment.
    pub fn has_changes(&self, trigger: RenewalTrigger) -> bool {
        self.name.is_some()
            || self.phone_number.is_some()
            || self.student_class.is_some()
            || trigger.carries_billing(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    PhoneNumber,
    StudentClass,
    Amount,
    PaymentStatus,
    PaymentTime,
    SubExpDate,
    UpdatedBy,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::PhoneNumber => "phone_number",
            Column::StudentClass => "student_class",
            Column::Amount => "amount",
            Column::PaymentStatus => "payment_status",
            Column::PaymentTime => "payment_time",
            Column::SubExpDate => "sub_exp_date",
            Column::UpdatedBy => "updated_by",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(String),
    Amount(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Column,
    pub value: ColumnValue,
}

impl Assignment {
    fn new(column: Column, value: ColumnValue) -> Self {
        Assignment { column, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalDecision {
    pub new_expiry: NaiveDate,
    pub stamp_payment_time: bool,
    pub set_actor: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePlan {
    pub assignments: Vec<Assignment>,
    pub renewal: Option<RenewalDecision>,
}

impl UpdatePlan {
    pub fn columns(&self) -> Vec<Column> {
        self.assignments.iter().map(|a| a.column).collect()
    }

    pub fn value_of(&self, column: Column) -> Option<&ColumnValue> {
        self.assignments
            .iter()
            .find(|a| a.column == column)
            .map(|a| &a.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("no valid fields to update")]
    NoFields,
}

#[derive(Debug, Clone, Copy)]
pub struct Planner {
    trigger: RenewalTrigger,
    now: DateTime<Utc>,
}

impl Planner {
    pub fn new(trigger: RenewalTrigger, now: DateTime<Utc>) -> Self {
        Planner { trigger, now }
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn plan(
        &self,
        snapshot: &BillingSnapshot,
        request: &UpdateRequest,
    ) -> Result<UpdatePlan, PlanError> {
        let mut assignments = Vec::new();

        if let Some(name) = &request.name {
            assignments.push(Assignment::new(Column::Name, ColumnValue::Text(name.clone())));
        }
        if let Some(phone) = &request.phone_number {
            assignments.push(Assignment::new(
                Column::PhoneNumber,
                ColumnValue::Text(phone.clone()),
            ));
        }
        if let Some(class) = &request.student_class {
            assignments.push(Assignment::new(
                Column::StudentClass,
                ColumnValue::Text(class.clone()),
            ));
        }

        let renews = match self.trigger {
            RenewalTrigger::Amount => {
                if request.payment_status.is_some() {
                    log::warn!(
                        "Ignoring `paymentStatus` for {}: renewals are amount-driven",
                        request.email
                    );
                }
                match request.amount {
                    Some(amount) => {
                        assignments.push(Assignment::new(
                            Column::Amount,
                            ColumnValue::Amount(amount),
                        ));
                        if amount <= 0.0 {
                            log::debug!(
                                "Amount {} for {} is not positive, recording amount only",
                                amount,
                                request.email
                            );
                        }
                        amount > 0.0
                    }
                    None => false,
                }
            }
            RenewalTrigger::Status => {
                if request.amount.is_some() {
                    log::warn!(
                        "Ignoring `amount` for {}: renewals are status-driven",
                        request.email
                    );
                }
                match &request.payment_status {
                    Some(status) => {
                        let status = canonical_status(status);
                        let entering_paid = status == PAID
                            && !is_paid(snapshot.payment_status.as_deref());
                        assignments.push(Assignment::new(
                            Column::PaymentStatus,
                            ColumnValue::Text(status),
                        ));
                        entering_paid
                    }
                    None => false,
                }
            }
        };

        let renewal = if renews {
            let decision = RenewalDecision {
                new_expiry: renew(snapshot.sub_exp_date, self.today()),
                stamp_payment_time: true,
                set_actor: request.updated_by.is_some(),
            };
            log::debug!(
                "Renewing {}: expiry {:?} -> {}",
                request.email,
                snapshot.sub_exp_date,
                decision.new_expiry
            );
            assignments.push(Assignment::new(
                Column::PaymentTime,
                ColumnValue::Timestamp(self.now),
            ));
            assignments.push(Assignment::new(
                Column::SubExpDate,
                ColumnValue::Date(decision.new_expiry),
            ));
            if let Some(actor) = &request.updated_by {
                assignments.push(Assignment::new(
                    Column::UpdatedBy,
                    ColumnValue::Text(actor.clone()),
                ));
            }
            Some(decision)
        } else {
            None
        };

        if assignments.is_empty() {
            log::info!("No valid fields to update for {}", request.email);
            return Err(PlanError::NoFields);
        }

        Ok(UpdatePlan {
            assignments,
            renewal,
        })
    }
}
