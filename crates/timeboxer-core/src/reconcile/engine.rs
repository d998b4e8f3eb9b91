//! Reconciliation engine.
//!
//! [`EventReconciler`] wires a calendar provider, a task store and a clock
//! into complete reconciliation passes. All three collaborators are injected;
//! the engine holds no global state. A pass runs to completion on the calling
//! thread: compute the whole plan first, then apply creations, deletions and
//! updates in that order, then save once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{CalendarAccess, CalendarProvider, DateRange};
use crate::clock::Clock;
use crate::error::ReconcileError;
use crate::task::Task;

use super::identity::IdentityMap;
use super::plan::{import_task, plan, ReconcilePlan};

/// Store operations the engine needs to apply a plan.
///
/// Both the automated reconciliation path and manual user edits are expected
/// to go through the same implementation, so a consistent persisted state is
/// observed after either.
pub trait TaskStore {
    /// Store-specific failure type.
    type Error: std::fmt::Display;

    /// Tasks carrying an external event id.
    fn imported_tasks(&self) -> Result<Vec<Task>, Self::Error>;

    /// Persist a new task (with its subtasks).
    fn create_task(&mut self, task: &Task) -> Result<(), Self::Error>;

    /// Rewrite a persisted task.
    fn update_task(&mut self, task: &Task) -> Result<(), Self::Error>;

    /// Delete a task. Cascades to its subtasks.
    fn delete_task(&mut self, id: Uuid) -> Result<(), Self::Error>;

    /// Flush pending writes.
    fn save(&mut self) -> Result<(), Self::Error>;
}

/// Why a pass was skipped without touching the store.
///
/// Both cases mean the source of truth was never loaded; neither is ever
/// interpreted as "the calendar is now empty".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Calendar access is not (or no longer) authorized.
    AccessNotGranted,
    /// The user has not selected any source calendars.
    NoCalendarsSelected,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileSummary {
    /// Tasks created.
    pub added: usize,
    /// Tasks removed.
    pub removed: usize,
    /// Tasks rewritten.
    pub updated: usize,
    /// Set when the pass was skipped as a no-op.
    pub skipped: Option<SkipReason>,
    /// When the pass ran.
    pub reconciled_at: DateTime<Utc>,
}

impl ReconcileSummary {
    fn skipped(reason: SkipReason, at: DateTime<Utc>) -> Self {
        ReconcileSummary {
            added: 0,
            removed: 0,
            updated: 0,
            skipped: Some(reason),
            reconciled_at: at,
        }
    }

    fn applied(plan: &ReconcilePlan, at: DateTime<Utc>) -> Self {
        ReconcileSummary {
            added: plan.additions.len(),
            removed: plan.removals.len(),
            updated: plan.updates.len(),
            skipped: None,
            reconciled_at: at,
        }
    }

    /// Whether the pass was skipped without loading the calendar.
    pub fn was_skipped(&self) -> bool {
        self.skipped.is_some()
    }

    /// Total number of store mutations applied.
    pub fn change_count(&self) -> usize {
        self.added + self.removed + self.updated
    }

    /// Human-readable one-line summary.
    pub fn message(&self) -> String {
        match self.skipped {
            Some(SkipReason::AccessNotGranted) => {
                "Skipped: calendar access not granted.".to_string()
            }
            Some(SkipReason::NoCalendarsSelected) => {
                "Skipped: no calendars selected.".to_string()
            }
            None if self.change_count() == 0 => {
                "Calendar and task store already in sync.".to_string()
            }
            None => format!(
                "Imported {}, removed {}, updated {} task(s).",
                self.added, self.removed, self.updated
            ),
        }
    }
}

/// Event-listing window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Days before `now` included in the listing window.
    pub past_days: i64,
    /// Days after `now` included in the listing window.
    pub future_days: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            past_days: 7,
            future_days: 30,
        }
    }
}

/// Keeps the persisted task collection consistent with the device calendar.
///
/// The calendar is authoritative for every task carrying an external event
/// id; manually created tasks are never touched.
pub struct EventReconciler<P, S, C> {
    provider: P,
    store: S,
    clock: C,
    ids: IdentityMap,
    config: ReconcilerConfig,
}

impl<P, S, C> EventReconciler<P, S, C>
where
    P: CalendarProvider,
    S: TaskStore,
    C: Clock,
{
    /// Create an engine from its collaborators, with a fresh identity map
    /// and the default listing window.
    pub fn new(provider: P, store: S, clock: C) -> Self {
        EventReconciler {
            provider,
            store,
            clock,
            ids: IdentityMap::new(),
            config: ReconcilerConfig::default(),
        }
    }

    /// Use a custom listing window.
    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the engine with a previously persisted identity map.
    pub fn with_identity_map(mut self, ids: IdentityMap) -> Self {
        self.ids = ids;
        self
    }

    /// Current identity map, for persistence by the caller.
    pub fn identity_map(&self) -> &IdentityMap {
        &self.ids
    }

    /// Shared access to the injected store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the injected store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Tear the engine apart into its collaborators and identity map.
    pub fn into_parts(self) -> (P, S, IdentityMap) {
        (self.provider, self.store, self.ids)
    }

    /// Run one reconciliation pass.
    ///
    /// Skips as a no-op (never a mass removal) when access is not authorized
    /// or no calendars are selected. An authorized listing over a non-empty
    /// calendar selection is authoritative even when it returns zero events.
    ///
    /// On a store failure the pass stops where it is: nothing is rolled back
    /// or retried, and the next trigger converges implicitly.
    pub fn run(&mut self) -> Result<ReconcileSummary, ReconcileError> {
        let now = self.clock.now();

        if self.provider.access() != CalendarAccess::Authorized {
            tracing::debug!("reconciliation skipped: calendar access not granted");
            return Ok(ReconcileSummary::skipped(SkipReason::AccessNotGranted, now));
        }

        let calendars = self
            .provider
            .selected_calendars()
            .map_err(|e| ReconcileError::Provider(e.to_string()))?;
        if calendars.is_empty() {
            tracing::debug!("reconciliation skipped: no calendars selected");
            return Ok(ReconcileSummary::skipped(SkipReason::NoCalendarsSelected, now));
        }

        let range = DateRange::around(now, self.config.past_days, self.config.future_days);
        let events = self
            .provider
            .events_in(&calendars, &range)
            .map_err(|e| ReconcileError::Provider(e.to_string()))?;

        let source: Vec<Task> = events
            .iter()
            .map(|event| {
                let id = self.ids.resolve(&event.external_id);
                import_task(event, id, now)
            })
            .collect();

        let persisted = self
            .store
            .imported_tasks()
            .map_err(|e| ReconcileError::Persistence(e.to_string()))?;

        let plan = plan(&source, &persisted);
        tracing::debug!(
            additions = plan.additions.len(),
            removals = plan.removals.len(),
            updates = plan.updates.len(),
            "reconciliation plan computed"
        );

        for task in &plan.additions {
            self.store
                .create_task(task)
                .map_err(|e| ReconcileError::Persistence(e.to_string()))?;
        }
        for task in &plan.removals {
            self.store
                .delete_task(task.id)
                .map_err(|e| ReconcileError::Persistence(e.to_string()))?;
        }
        for task in &plan.updates {
            self.store
                .update_task(task)
                .map_err(|e| ReconcileError::Persistence(e.to_string()))?;
        }
        self.store
            .save()
            .map_err(|e| ReconcileError::Persistence(e.to_string()))?;

        let summary = ReconcileSummary::applied(&plan, now);
        tracing::info!(
            added = summary.added,
            removed = summary.removed,
            updated = summary.updated,
            "reconciliation pass applied"
        );
        Ok(summary)
    }
}
