//! The student update engine: permission gate, planner and executor, run
//! in that order for every update request.

use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::auth::Principal;
use crate::models::{BillingSnapshot, Email};
use crate::permission::{Denied, GateError, PermissionGate, RequestKind};
use crate::planner::{PlanError, Planner, RenewalTrigger, UpdateRequest};
use crate::store::{StoreError, StudentStore};

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Forbidden(Denied),
    #[error("no valid fields to update")]
    NoFields,
    #[error("no student found with email {0}")]
    NotFound(Email),
    #[error("failed to verify user permissions: {0}")]
    RoleLookup(StoreError),
    #[error("update failed: {0}")]
    Store(StoreError),
}

impl From<GateError> for UpdateError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Denied(denied) => UpdateError::Forbidden(denied),
            GateError::Lookup(store) => UpdateError::RoleLookup(store),
        }
    }
}

impl From<StoreError> for UpdateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Plan(PlanError::NoFields) => UpdateError::NoFields,
            other => UpdateError::Store(other),
        }
    }
}

/// One request's time budget. Every store call of the request shares it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Deadline {
            at: Instant::now() + budget,
            budget,
        }
    }
}

/// Runs a store call under what is left of `deadline`.
pub async fn within<T, F>(deadline: Deadline, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout_at(deadline.at, call)
        .await
        .map_err(|_| StoreError::Timeout(deadline.budget))?
}

#[derive(Clone)]
pub struct UpdateEngine {
    store: Arc<dyn StudentStore>,
    gate: PermissionGate,
    trigger: RenewalTrigger,
    deadline: Duration,
}

impl UpdateEngine {
    pub fn new(store: Arc<dyn StudentStore>, trigger: RenewalTrigger, deadline: Duration) -> Self {
        UpdateEngine {
            gate: PermissionGate::new(store.clone()),
            store,
            trigger,
            deadline,
        }
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    /// Starts the deadline for a request arriving now.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.deadline)
    }

    /// Applies `request` on behalf of `principal`. Returns the rows changed,
    /// which is always at least one on success.
    pub async fn update_student(
        &self,
        principal: &Principal,
        request: &UpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<u64, UpdateError> {
        let deadline = self.deadline();
        let kind = RequestKind::classify(self.trigger, request);
        match tokio::time::timeout_at(deadline.at, self.gate.check(&principal.email, kind)).await {
            Ok(checked) => checked?,
            Err(_) => return Err(UpdateError::RoleLookup(StoreError::Timeout(deadline.budget))),
        };

        if !request.has_changes(self.trigger) {
            log::info!("No valid fields to update for {}", request.email);
            return Err(UpdateError::NoFields);
        }

        log::info!(
            "Updating student {} ({:?} update by {})",
            request.email,
            kind,
            principal.email
        );
        let planner = Planner::new(self.trigger, now);
        let plan = |snapshot: &BillingSnapshot| planner.plan(snapshot, request);
        let rows = within(deadline, self.store.apply_update(&request.email, &plan))
            .await
        .map_err(|err| {
            if !matches!(err, StoreError::Plan(_)) {
                log::error!("Error updating student {}: {}", request.email, err);
            }
            UpdateError::from(err)
        })?;

        if rows == 0 {
            return Err(UpdateError::NotFound(request.email.clone()));
        }
        Ok(rows)
    }
}
