use std::sync::Arc;
use thiserror::Error;

use crate::models::{Email, Role};
use crate::planner::{RenewalTrigger, UpdateRequest};
use crate::store::{StoreError, StudentStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Touches billing columns.
    Subscription,
    Profile,
}

impl RequestKind {
    pub fn classify(trigger: RenewalTrigger, request: &UpdateRequest) -> RequestKind {
        if trigger.carries_billing(request) {
            RequestKind::Subscription
        } else {
            RequestKind::Profile
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Denied {
    pub reason: &'static str,
}

pub fn authorize(role: Role, kind: RequestKind) -> Result<(), Denied> {
    match (kind, role) {
        (RequestKind::Subscription, Role::Super) => Ok(()),
        (RequestKind::Subscription, _) => Err(Denied {
            reason: "Only 'super' role can update subscription",
        }),
        (RequestKind::Profile, Role::Admin | Role::Super) => Ok(()),
        (RequestKind::Profile, Role::None) => Err(Denied {
            reason: "Only 'admin' or 'super' role can update student fields",
        }),
    }
}

#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Denied(#[from] Denied),
    #[error("failed to look up role: {0}")]
    Lookup(#[from] StoreError),
}

/// Resolves the caller's role from the student store and applies [`authorize`].
#[derive(Clone)]
pub struct PermissionGate {
    store: Arc<dyn StudentStore>,
}

impl PermissionGate {
    pub fn new(store: Arc<dyn StudentStore>) -> Self {
        PermissionGate { store }
    }

    pub async fn role_of(&self, identity: &Email) -> Result<Role, StoreError> {
        let tag = self.store.role_of(identity).await?;
        Ok(Role::from_tag(tag.as_deref()))
    }

    pub async fn check(&self, identity: &Email, kind: RequestKind) -> Result<Role, GateError> {
        let role = self.role_of(identity).await?;
        if let Err(denied) = authorize(role, kind) {
            log::warn!(
                "Denied {:?} update for {} (role `{}`): {}",
                kind,
                identity,
                role,
                denied
            );
            return Err(denied.into());
        }
        Ok(role)
    }
}
