use serde::{Deserialize, Serialize};

use crate::domain::branch::BranchId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Elevated,
    Scoped,
}

/// An authenticated caller as resolved by the external identity layer.
/// Credential handling never reaches this type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub role: ActorRole,
    pub branch_id: Option<BranchId>,
}

impl Actor {
    pub fn is_elevated(&self) -> bool {
        self.role == ActorRole::Elevated
    }

    /// A scoped actor must carry a branch assignment; an elevated actor must not.
    pub fn validate(&self) -> Result<(), DomainError> {
        match (self.role, &self.branch_id) {
            (ActorRole::Scoped, None) => Err(DomainError::validation(format!(
                "scoped actor `{}` has no branch assignment",
                self.username
            ))),
            (ActorRole::Elevated, Some(_)) => Err(DomainError::validation(format!(
                "elevated actor `{}` must not be branch-assigned",
                self.username
            ))),
            _ => Ok(()),
        }
    }

    pub fn require_elevated(&self, operation: &str) -> Result<(), DomainError> {
        if self.is_elevated() {
            return Ok(());
        }
        Err(DomainError::authorization(format!(
            "`{}` requires an elevated actor for {operation}",
            self.username
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::actor::{Actor, ActorId, ActorRole};
    use crate::domain::branch::BranchId;
    use crate::errors::DomainError;

    fn scoped(branch: Option<&str>) -> Actor {
        Actor {
            id: ActorId("U-1".to_string()),
            username: "ops.b1".to_string(),
            role: ActorRole::Scoped,
            branch_id: branch.map(|b| BranchId(b.to_string())),
        }
    }

    #[test]
    fn scoped_actor_without_branch_is_invalid() {
        let error = scoped(None).validate().expect_err("must fail");
        assert!(matches!(error, DomainError::Validation(_)));
    }

    #[test]
    fn scoped_actor_with_branch_is_valid() {
        scoped(Some("B1")).validate().expect("valid");
    }

    #[test]
    fn require_elevated_rejects_scoped_actors() {
        let error = scoped(Some("B1")).require_elevated("decide").expect_err("must fail");
        assert!(matches!(error, DomainError::Authorization(_)));
    }
}
