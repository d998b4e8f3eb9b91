//! Calendar-to-task reconciliation.
//!
//! Keeps the persisted task collection consistent with the device calendar's
//! current event list, treating the calendar as authoritative for any task
//! carrying an external event id. A pass maps the fresh event list onto
//! task-shaped values, computes the three-way diff against the persisted
//! imported tasks, and applies creations, then deletions, then updates
//! through the injected store.

pub mod engine;
pub mod identity;
pub mod plan;


pub use engine::{
    EventReconciler, ReconcileSummary, ReconcilerConfig, SkipReason, TaskStore,
};
pub use identity::{derive_task_id, IdentityMap, IDENTITY_MAP_VERSION, UUID_SUFFIX_LEN};
pub use plan::{import_task, plan, ReconcilePlan};
