//! # Timeboxer Core Library
//!
//! Core business logic for Timeboxer, a time-boxing task manager. The
//! presentation layer (whatever renders calendars and timers) consumes this
//! crate in-process; there is no network surface and no CLI.
//!
//! ## Architecture
//!
//! - **Task model**: schedulable tasks with subtasks; the start/end interval
//!   is an `Option<Schedule>`, so a half-scheduled task cannot exist
//! - **Classification**: pure temporal-kind and status derivation over task
//!   snapshots, with the current time passed in by the caller
//! - **Reconciliation**: three-way diff between the device calendar's event
//!   list and the persisted imported tasks, applied through injected
//!   collaborators
//! - **Storage**: SQLite task/session store and TOML-based configuration
//! - **Sessions & stats**: immutable focus-run records, explicit scoring
//!   policy, day/week/month aggregation
//!
//! ## Key Components
//!
//! - [`Task`] / [`classify`]: the task model and its classifier
//! - [`EventReconciler`]: calendar-to-task reconciliation engine
//! - [`Database`]: task, subtask and session persistence
//! - [`CalendarProvider`] / [`Clock`]: injected collaborator traits

pub mod calendar;
pub mod clock;
pub mod error;
pub mod reconcile;
pub mod session;
pub mod stats;
pub mod storage;
pub mod task;

pub use calendar::{CalendarAccess, CalendarProvider, CalendarRef, DateRange, ExternalEvent};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{
    ConfigError, CoreError, MalformedExternalId, PersistenceError, ReconcileError, ValidationError,
};
pub use reconcile::{
    EventReconciler, IdentityMap, ReconcilePlan, ReconcileSummary, ReconcilerConfig, SkipReason,
    TaskStore,
};
pub use session::{FocusMode, ScorePolicy, TaskSession};
pub use stats::FocusTotals;
pub use storage::{Config, Database};
pub use task::{classify, Classification, Schedule, Subtask, Task, TemporalKind};
