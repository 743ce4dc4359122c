pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod scope;
pub mod snapshot;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use domain::actor::{Actor, ActorId, ActorRole};
pub use domain::branch::{Branch, BranchId};
pub use domain::review::{
    ReviewAction, ReviewFilter, ReviewRequest, ReviewRequestId, ReviewStatus,
};
pub use domain::waste::{
    ReasonCode, Unit, WasteRecord, WasteRecordDraft, WasteRecordFilter, WasteRecordId,
    WasteRecordPatch,
};
pub use errors::DomainError;
pub use scope::BranchScope;
pub use snapshot::WasteSnapshot;
