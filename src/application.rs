//! Application layer module
//!
//! This module contains the sync pipeline and the category report that
//! orchestrate the domain logic.

pub mod change_aware_store;
pub mod report;
pub mod sync_orchestrator;

pub use change_aware_store::ChangeAwareStore;
pub use report::write_category_report;
pub use sync_orchestrator::SyncOrchestrator;
