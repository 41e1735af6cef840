//! Event use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for event callers.
//! - Run the overlap merge and reconcile the store with its outcome.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - The merge sweep only runs over a start-ordered sequence; ordering is
//!   enforced here rather than trusted from the store.
//! - Merge invocations for the same user must not run concurrently; the
//!   caller serializes them.

use crate::model::event::{Event, EventId};
use crate::model::user::UserId;
use crate::repo::event_repo::{EventListQuery, EventRepository, RepoResult};
use crate::service::merge::{plan_merge, MergeOutcome};
use log::info;
use std::time::Instant;

/// Use-case service wrapper for event operations.
pub struct EventService<R: EventRepository> {
    repo: R,
}

/// Request model for scheduling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEventRequest {
    /// Event title.
    pub title: String,
    /// Optional free-form text.
    pub description: Option<String>,
    /// Event start in epoch milliseconds.
    pub start_ms: i64,
    /// Event end in epoch milliseconds.
    pub end_ms: i64,
    /// Invited users.
    pub invitees: Vec<UserId>,
}

impl<R: EventRepository> EventService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Schedules a new event with default `Todo` status.
    pub fn schedule_event(&mut self, request: &ScheduleEventRequest) -> RepoResult<Event> {
        let mut event = Event::new(request.title.clone(), request.start_ms, request.end_ms);
        event.description = request.description.clone();
        event.invitees = request.invitees.clone();
        self.repo.create_event(&event)?;
        Ok(event)
    }

    /// Gets one event by ID with optional deleted-row visibility.
    pub fn get_event(&self, id: EventId, include_deleted: bool) -> RepoResult<Option<Event>> {
        self.repo.get_event(id, include_deleted)
    }

    /// Lists events using filter and pagination options.
    pub fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<Event>> {
        self.repo.list_events(query)
    }

    /// Lists all active events the given user is invited to.
    pub fn events_for_user(&self, user_id: UserId) -> RepoResult<Vec<Event>> {
        self.repo.events_for_user(user_id)
    }

    /// Updates an existing event by stable ID.
    ///
    /// Returns repository-level not-found or validation errors unchanged.
    pub fn update_event(&mut self, event: &Event) -> RepoResult<()> {
        self.repo.update_event(event)
    }

    /// Soft-deletes an event by ID.
    pub fn remove_event(&self, id: EventId) -> RepoResult<()> {
        self.repo.remove_event(id)
    }

    /// Collapses all temporally overlapping events of one user into one
    /// event per overlap-connected cluster and reconciles the store.
    ///
    /// # Contract
    /// - Returns one event per cluster, ordered by cluster start.
    /// - Absorbed originals are tombstoned; the surviving event of each
    ///   cluster keeps the id of its earliest-starting member.
    /// - A user with no events yields an empty result and no store writes.
    /// - Store failures propagate unchanged; there is no retry and no
    ///   rollback. If the save succeeds and the delete fails, re-running the
    ///   merge converges, since surviving ids are stable.
    pub fn merge_overlapping_events(&mut self, user_id: UserId) -> RepoResult<Vec<Event>> {
        let started_at = Instant::now();
        let mut events = self.repo.events_for_user(user_id)?;
        let fetched = events.len();

        if events.is_empty() {
            info!(
                "event=merge_overlaps module=service status=ok user={user_id} fetched=0 clusters=0 absorbed=0 duration_ms={}",
                started_at.elapsed().as_millis()
            );
            return Ok(Vec::new());
        }

        // The sweep is only correct over ascending start order. The store
        // promises it, but a different repository implementation might not.
        events.sort_by(|a, b| (a.start_ms, a.uuid).cmp(&(b.start_ms, b.uuid)));

        let MergeOutcome { merged, absorbed } = plan_merge(events);

        self.repo.save_all(&merged)?;
        if !absorbed.is_empty() {
            self.repo.delete_by_ids(&absorbed)?;
        }

        info!(
            "event=merge_overlaps module=service status=ok user={user_id} fetched={fetched} clusters={} absorbed={} duration_ms={}",
            merged.len(),
            absorbed.len(),
            started_at.elapsed().as_millis()
        );

        Ok(merged)
    }
}
