//! Event-to-task field mapping and the pure three-way diff.
//!
//! `plan` compares two snapshots -- the freshly mapped external events and
//! the persisted imported tasks -- and returns the additions, removals and
//! updates needed to make the store match the calendar. Nothing is applied
//! here; the [`engine`](super::engine) (or any other caller) applies the plan
//! through its store.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::ExternalEvent;
use crate::task::scheduling::{end_of_day, start_of_day};
use crate::task::{Schedule, Task};

/// Map an external event onto a task-shaped value under a resolved identity.
///
/// Applied on initial import; `completed` is always false here and subtasks
/// start empty. Updates re-apply the same mapping through [`apply_mapping`],
/// which preserves user state instead.
pub fn import_task(event: &ExternalEvent, id: Uuid, now: DateTime<Utc>) -> Task {
    Task {
        id,
        title: event.title.clone(),
        label: Some(event.calendar.name.clone()),
        color: event.calendar.color.clone(),
        important: event.has_alarm,
        schedule: Some(event_schedule(event)),
        completed: false,
        subtasks: Vec::new(),
        external_event_id: Some(event.external_id.clone()),
        created_at: now,
        updated_at: now,
    }
}

/// Interval mapping: an all-day event snaps to midnight .. 23:59:59 of its
/// start day; a timed event keeps its start/end unchanged.
fn event_schedule(event: &ExternalEvent) -> Schedule {
    if event.all_day {
        Schedule::new(start_of_day(event.start), end_of_day(event.start))
    } else {
        Schedule::new(event.start, event.end)
    }
}

/// Whether any field the mapping owns differs between the incoming event
/// form and the persisted task. The alarm-driven important flag is rewritten
/// on update but does not itself trigger one.
fn mapped_fields_differ(incoming: &Task, existing: &Task) -> bool {
    incoming.title != existing.title
        || incoming.label != existing.label
        || incoming.color != existing.color
        || incoming.schedule != existing.schedule
}

/// Rewrite the mapped fields of `existing` from the incoming event form,
/// preserving user state: completion flag, subtasks, creation timestamp.
pub fn apply_mapping(existing: &Task, incoming: &Task) -> Task {
    Task {
        id: existing.id,
        title: incoming.title.clone(),
        label: incoming.label.clone(),
        color: incoming.color.clone(),
        important: incoming.important,
        schedule: incoming.schedule.clone(),
        completed: existing.completed,
        subtasks: existing.subtasks.clone(),
        external_event_id: incoming.external_event_id.clone(),
        created_at: existing.created_at,
        updated_at: incoming.updated_at,
    }
}

/// Result of one reconciliation diff. The three sets are mutually exclusive:
/// a task either has a match on the other side or it doesn't, and updates
/// require a match plus a field delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcilePlan {
    /// Tasks to create (present upstream, absent in the store).
    pub additions: Vec<Task>,
    /// Tasks to delete (absent upstream). Deletion cascades to subtasks.
    pub removals: Vec<Task>,
    /// Tasks to rewrite (matched, with at least one mapped field changed).
    pub updates: Vec<Task>,
}

impl ReconcilePlan {
    /// Whether the pass has nothing to apply.
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty() && self.updates.is_empty()
    }

    /// Total number of store mutations the plan implies.
    pub fn change_count(&self) -> usize {
        self.additions.len() + self.removals.len() + self.updates.len()
    }

    /// Human-readable one-line summary.
    pub fn message(&self) -> String {
        if self.is_empty() {
            "Calendar and task store already in sync.".to_string()
        } else {
            format!(
                "Importing {} new, removing {} stale, updating {} changed task(s).",
                self.additions.len(),
                self.removals.len(),
                self.updates.len()
            )
        }
    }
}

/// Compute the three-way diff between the mapped event list and the
/// persisted imported tasks.
///
/// Both inputs are snapshots; all three sets are computed before anything is
/// applied. `persisted` is expected to be pre-filtered to imported tasks
/// (non-null external event id).
pub fn plan(source: &[Task], persisted: &[Task]) -> ReconcilePlan {
    let persisted_by_id: HashMap<Uuid, &Task> = persisted.iter().map(|t| (t.id, t)).collect();
    let source_ids: HashSet<Uuid> = source.iter().map(|t| t.id).collect();

    let additions = source
        .iter()
        .filter(|incoming| !persisted_by_id.contains_key(&incoming.id))
        .cloned()
        .collect();

    let removals = persisted
        .iter()
        .filter(|existing| !source_ids.contains(&existing.id))
        .cloned()
        .collect();

    let updates = source
        .iter()
        .filter_map(|incoming| {
            persisted_by_id
                .get(&incoming.id)
                .filter(|existing| mapped_fields_differ(incoming, existing))
                .map(|existing| apply_mapping(existing, incoming))
        })
        .collect();

    ReconcilePlan {
        additions,
        removals,
        updates,
    }
}
