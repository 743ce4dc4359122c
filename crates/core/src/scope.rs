use crate::domain::actor::Actor;
use crate::domain::branch::BranchId;
use crate::domain::review::ReviewRequest;
use crate::domain::waste::WasteRecord;
use crate::errors::DomainError;

/// Branch visibility for a read, resolved once per call and pushed down into
/// the store query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BranchScope {
    All,
    Only(BranchId),
}

impl BranchScope {
    /// Resolve the effective scope for `actor`, honoring an explicit branch
    /// filter. A scoped actor may only ask for their own branch.
    pub fn resolve(actor: &Actor, requested: Option<&BranchId>) -> Result<Self, DomainError> {
        if actor.is_elevated() {
            return Ok(match requested {
                Some(branch) => Self::Only(branch.clone()),
                None => Self::All,
            });
        }

        let own = actor.branch_id.clone().ok_or_else(|| {
            DomainError::validation(format!(
                "scoped actor `{}` has no branch assignment",
                actor.username
            ))
        })?;

        match requested {
            Some(branch) if *branch != own => Err(DomainError::authorization(format!(
                "`{}` cannot read branch `{}`",
                actor.username, branch.0
            ))),
            _ => Ok(Self::Only(own)),
        }
    }

    pub fn permits(&self, branch: &BranchId) -> bool {
        match self {
            Self::All => true,
            Self::Only(own) => own == branch,
        }
    }

    pub fn permits_record(&self, record: &WasteRecord) -> bool {
        self.permits(&record.branch_id)
    }

    pub fn permits_review(&self, request: &ReviewRequest) -> bool {
        self.permits(&request.branch_id)
    }
}

/// Branch check for a scoped actor mutating an existing record.
pub fn ensure_record_in_actor_branch(actor: &Actor, record: &WasteRecord) -> Result<(), DomainError> {
    if actor.is_elevated() || actor.branch_id.as_ref() == Some(&record.branch_id) {
        return Ok(());
    }
    Err(DomainError::authorization(format!(
        "`{}` cannot mutate records of branch `{}`",
        actor.username, record.branch_id.0
    )))
}
