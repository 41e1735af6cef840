//! Overlap reduction over a sorted event run.
//!
//! # Responsibility
//! - Partition a start-ordered event sequence into overlap-connected
//!   clusters and collapse each cluster into one combined event.
//! - Report which original ids were absorbed, so reconciliation against the
//!   store does not have to infer deletions from id aliasing.
//!
//! # Invariants
//! - Input must be sorted ascending by start time; the caller enforces this.
//! - `combine` is pure: it never mutates its inputs and the surviving
//!   identity is always the accumulator's.
//! - Boundary-touching events (`a.end_ms == b.start_ms`) do not overlap.

use crate::model::event::{Event, EventId, EventStatus};
use std::collections::BTreeSet;

/// Result of one reduction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// One event per overlap-connected cluster, in cluster-open order.
    pub merged: Vec<Event>,
    /// Ids of original events folded into an accumulator. The accumulator's
    /// own id is never listed here.
    pub absorbed: Vec<EventId>,
}

/// Strict interval overlap. Equal boundaries do not count.
pub fn overlaps(a: &Event, b: &Event) -> bool {
    a.end_ms > b.start_ms && a.start_ms < b.end_ms
}

/// Folds `next` into `acc`, producing a new combined event.
///
/// The combined record keeps the accumulator's identity, spans the union of
/// both time windows, joins titles left to right, and is always forced to
/// `InProgress`. Descriptions concatenate with a single space, an absent
/// description standing in as the empty string.
pub fn combine(acc: &Event, next: &Event) -> Event {
    let invitees: BTreeSet<_> = acc
        .invitees
        .iter()
        .chain(next.invitees.iter())
        .copied()
        .collect();

    Event {
        uuid: acc.uuid,
        title: format!("{}, {}", acc.title, next.title),
        description: Some(format!(
            "{} {}",
            acc.description.as_deref().unwrap_or(""),
            next.description.as_deref().unwrap_or("")
        )),
        start_ms: acc.start_ms.min(next.start_ms),
        end_ms: acc.end_ms.max(next.end_ms),
        status: EventStatus::InProgress,
        invitees: invitees.into_iter().collect(),
        is_deleted: false,
    }
}

/// Single left-to-right sweep over a start-ordered event run.
///
/// Overlap is chained through the accumulator: an event that overlaps the
/// combined window joins the cluster even if it does not overlap the
/// cluster's first member. Singleton clusters pass through unchanged.
pub fn plan_merge(events: Vec<Event>) -> MergeOutcome {
    let mut merged = Vec::new();
    let mut absorbed = Vec::new();
    let mut current: Option<Event> = None;

    for event in events {
        match current.take() {
            Some(acc) if overlaps(&acc, &event) => {
                absorbed.push(event.uuid);
                current = Some(combine(&acc, &event));
            }
            Some(acc) => {
                merged.push(acc);
                current = Some(event);
            }
            None => current = Some(event),
        }
    }

    if let Some(acc) = current {
        merged.push(acc);
    }

    MergeOutcome { merged, absorbed }
}
