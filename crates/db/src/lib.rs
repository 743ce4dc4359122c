pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod workflow;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::SeedDataset;
pub use workflow::{
    ApprovalProcessor, BranchAdmin, Decision, DecisionOutcome, MutationGateway, MutationIntent,
    MutationOutcome, WorkflowError,
};
