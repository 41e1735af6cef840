use agenda_core::db::migrations::latest_version;
use agenda_core::db::open_db_in_memory;
use agenda_core::{
    Event, EventListQuery, EventRepository, EventService, EventStatus, RepoError,
    ScheduleEventRequest, SqliteEventRepository, SqliteUserRepository, User, UserRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn registered_user(conn: &Connection, name: &str) -> User {
    let repo = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new(name);
    repo.create_user(&user).unwrap();
    user
}

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let invitee = registered_user(&conn, "alice");
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let mut event = Event::new("kickoff", 1_000, 2_000);
    event.description = Some("project kickoff".to_string());
    event.invitees = vec![invitee.uuid];
    let id = repo.create_event(&event).unwrap();

    let loaded = repo.get_event(id, false).unwrap().unwrap();
    assert_eq!(loaded.uuid, event.uuid);
    assert_eq!(loaded.title, "kickoff");
    assert_eq!(loaded.description.as_deref(), Some("project kickoff"));
    assert_eq!(loaded.start_ms, 1_000);
    assert_eq!(loaded.end_ms, 2_000);
    assert_eq!(loaded.status, EventStatus::Todo);
    assert_eq!(loaded.invitees, vec![invitee.uuid]);
    assert!(!loaded.is_deleted);
}

#[test]
fn update_existing_event() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let mut event = Event::new("draft", 1_000, 2_000);
    repo.create_event(&event).unwrap();

    event.title = "rescheduled".to_string();
    event.start_ms = 3_000;
    event.end_ms = 4_000;
    event.status = EventStatus::Done;
    repo.update_event(&event).unwrap();

    let loaded = repo.get_event(event.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.title, "rescheduled");
    assert_eq!(loaded.start_ms, 3_000);
    assert_eq!(loaded.end_ms, 4_000);
    assert_eq!(loaded.status, EventStatus::Done);
}

#[test]
fn update_not_found_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event = Event::new("missing", 0, 100);
    let err = repo.update_event(&event).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == event.uuid));
}

#[test]
fn list_excludes_deleted_by_default_and_can_include_them() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event_a = Event::new("active", 1_000, 2_000);
    let event_b = Event::new("deleted later", 3_000, 4_000);
    repo.create_event(&event_a).unwrap();
    repo.create_event(&event_b).unwrap();
    repo.remove_event(event_b.uuid).unwrap();

    let visible = repo.list_events(&EventListQuery::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, event_a.uuid);

    let include_deleted = EventListQuery {
        include_deleted: true,
        ..EventListQuery::default()
    };
    let all = repo.list_events(&include_deleted).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn list_filters_by_status() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let todo = Event::new("todo item", 1_000, 2_000);
    let mut done = Event::new("done item", 3_000, 4_000);
    done.status = EventStatus::Done;
    repo.create_event(&todo).unwrap();
    repo.create_event(&done).unwrap();

    let query = EventListQuery {
        status: Some(EventStatus::Done),
        ..EventListQuery::default()
    };
    let result = repo.list_events(&query).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].uuid, done.uuid);
}

#[test]
fn list_orders_by_start_then_uuid() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let early = Event::with_id(
        Uuid::parse_str("00000000-0000-4000-8000-000000000002").unwrap(),
        "early",
        1_000,
        2_000,
    )
    .unwrap();
    let tied_low = Event::with_id(
        Uuid::parse_str("00000000-0000-4000-8000-000000000001").unwrap(),
        "tie low uuid",
        5_000,
        6_000,
    )
    .unwrap();
    let tied_high = Event::with_id(
        Uuid::parse_str("00000000-0000-4000-8000-000000000003").unwrap(),
        "tie high uuid",
        5_000,
        6_000,
    )
    .unwrap();
    repo.create_event(&tied_high).unwrap();
    repo.create_event(&early).unwrap();
    repo.create_event(&tied_low).unwrap();

    let listed = repo.list_events(&EventListQuery::default()).unwrap();
    let ids: Vec<_> = listed.into_iter().map(|event| event.uuid).collect();
    assert_eq!(ids, vec![early.uuid, tied_low.uuid, tied_high.uuid]);
}

#[test]
fn remove_event_is_idempotent() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event = Event::new("weekly sync", 1_000, 2_000);
    repo.create_event(&event).unwrap();

    repo.remove_event(event.uuid).unwrap();
    repo.remove_event(event.uuid).unwrap();

    assert!(repo.get_event(event.uuid, false).unwrap().is_none());
    let deleted = repo.get_event(event.uuid, true).unwrap().unwrap();
    assert!(deleted.is_deleted);
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let invalid = Event::new("bad range", 300, 100);
    let create_err = repo.create_event(&invalid).unwrap_err();
    assert!(matches!(create_err, RepoError::Validation(_)));

    let mut valid = Event::new("good range", 100, 200);
    repo.create_event(&valid).unwrap();

    valid.end_ms = 50;
    let update_err = repo.update_event(&valid).unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));
}

#[test]
fn save_all_upserts_existing_and_inserts_new() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let mut existing = Event::new("existing", 1_000, 2_000);
    repo.create_event(&existing).unwrap();

    existing.title = "existing, updated".to_string();
    existing.status = EventStatus::InProgress;
    let fresh = Event::new("fresh", 5_000, 6_000);

    let written = repo.save_all(&[existing.clone(), fresh.clone()]).unwrap();
    assert_eq!(written, 2);

    let loaded_existing = repo.get_event(existing.uuid, false).unwrap().unwrap();
    assert_eq!(loaded_existing.title, "existing, updated");
    assert_eq!(loaded_existing.status, EventStatus::InProgress);

    let loaded_fresh = repo.get_event(fresh.uuid, false).unwrap().unwrap();
    assert_eq!(loaded_fresh.title, "fresh");
}

#[test]
fn delete_by_ids_tolerates_absent_ids_and_counts_live_rows() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();

    let event_a = Event::new("a", 1_000, 2_000);
    let event_b = Event::new("b", 3_000, 4_000);
    repo.create_event(&event_a).unwrap();
    repo.create_event(&event_b).unwrap();

    let never_stored = Uuid::new_v4();
    let affected = repo
        .delete_by_ids(&[event_a.uuid, never_stored])
        .unwrap();
    assert_eq!(affected, 1);

    // Re-deleting already tombstoned rows is a silent no-op.
    let repeated = repo
        .delete_by_ids(&[event_a.uuid, never_stored])
        .unwrap();
    assert_eq!(repeated, 0);

    assert!(repo.get_event(event_a.uuid, false).unwrap().is_none());
    assert!(repo.get_event(event_b.uuid, false).unwrap().is_some());

    assert_eq!(repo.delete_by_ids(&[]).unwrap(), 0);
}

#[test]
fn service_wraps_repository_calls() {
    let mut conn = open_db_in_memory().unwrap();
    let invitee = registered_user(&conn, "alice");
    let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
    let mut service = EventService::new(repo);

    let mut event = service
        .schedule_event(&ScheduleEventRequest {
            title: "from service".to_string(),
            description: None,
            start_ms: 1_000,
            end_ms: 2_000,
            invitees: vec![invitee.uuid],
        })
        .unwrap();

    event.status = EventStatus::InProgress;
    service.update_event(&event).unwrap();

    let fetched = service.get_event(event.uuid, false).unwrap().unwrap();
    assert_eq!(fetched.title, "from service");
    assert_eq!(fetched.status, EventStatus::InProgress);

    let ids: Vec<_> = service
        .list_events(&EventListQuery::default())
        .unwrap()
        .into_iter()
        .map(|item| item.uuid)
        .collect();
    assert!(ids.contains(&event.uuid));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let mut conn = Connection::open_in_memory().unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_events_table() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("events"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_events_column() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE events (
            uuid TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE users (uuid TEXT PRIMARY KEY NOT NULL, name TEXT NOT NULL);
        CREATE TABLE event_invitees (
            event_uuid TEXT NOT NULL,
            user_uuid TEXT NOT NULL,
            PRIMARY KEY (event_uuid, user_uuid)
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteEventRepository::try_new(&mut conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "events",
            column: "description"
        })
    ));
}
