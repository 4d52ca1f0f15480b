use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Lowercased, trimmed email. Every store lookup and write goes through this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse<S: AsRef<str>>(raw: S) -> Option<Email> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Email(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Email::parse(raw).ok_or_else(|| serde::de::Error::custom("`email` was empty"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    None,
    Admin,
    Super,
}

impl Role {
    /// Unknown tags are treated the same as no role at all.
    pub fn from_tag(tag: Option<&str>) -> Role {
        match tag.map(str::trim) {
            Some("admin") => Role::Admin,
            Some("super") => Role::Super,
            _ => Role::None,
        }
    }

    pub fn is_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Super)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::None => f.write_str(""),
            Role::Admin => f.write_str("admin"),
            Role::Super => f.write_str("super"),
        }
    }
}

pub const PAID: &str = "PAID";
pub const UNPAID: &str = "UNPAID";

/// Canonical form of a payment-status tag as stored in `students.payment_status`.
pub fn canonical_status(tag: &str) -> String {
    tag.trim().to_uppercase()
}

pub fn is_paid(tag: Option<&str>) -> bool {
    tag.map(|t| canonical_status(t) == PAID).unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StudentRecord {
    pub id: i32,
    pub email: String,
    pub name: Option<String>,
    pub student_class: Option<String>,
    pub phone_number: Option<String>,
    pub sub_exp_date: Option<NaiveDate>,
    pub updated_by: Option<String>,
    pub amount: Option<f64>,
    pub payment_time: Option<DateTime<Utc>>,
    pub role: Option<String>,
    #[serde(skip_serializing)]
    pub payment_status: Option<String>,
}

/// Billing columns of a student row, read under the update's row lock.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct BillingSnapshot {
    pub sub_exp_date: Option<NaiveDate>,
    pub payment_status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewStudent {
    pub email: Email,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub student_class: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        let email = Email::parse("  Jane.Doe@Example.COM ").unwrap();
        assert_eq!(email.as_str(), "jane.doe@example.com");
    }

    #[test]
    fn blank_email_is_rejected() {
        assert!(Email::parse("").is_none());
        assert!(Email::parse("   ").is_none());
    }

    #[test]
    fn role_tags() {
        assert_eq!(Role::from_tag(Some("super")), Role::Super);
        assert_eq!(Role::from_tag(Some("admin")), Role::Admin);
        assert_eq!(Role::from_tag(Some("")), Role::None);
        assert_eq!(Role::from_tag(Some("teacher")), Role::None);
        assert_eq!(Role::from_tag(None), Role::None);
    }

    #[test]
    fn paid_tag_is_case_insensitive() {
        assert!(is_paid(Some("paid")));
        assert!(is_paid(Some(" PAID ")));
        assert!(!is_paid(Some("UNPAID")));
        assert!(!is_paid(None));
    }
}
