//! Event repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `events` storage.
//! - Provide the bulk fetch/save/delete operations the overlap merger needs.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Event::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Every returned event carries its invitee links; callers never lazy-load
//!   the relation.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::event::{Event, EventId, EventStatus, EventValidationError};
use crate::model::user::{UserId, UserValidationError};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    description,
    start_ms,
    end_ms,
    status,
    is_deleted
FROM events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for event/user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(EventValidationError),
    UserValidation(UserValidationError),
    Db(DbError),
    NotFound(Uuid),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UserValidation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: schema version {actual_version}, expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::UserValidation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EventValidationError> for RepoError {
    fn from(value: EventValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::UserValidation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing events.
#[derive(Debug, Clone, Default)]
pub struct EventListQuery {
    pub status: Option<EventStatus>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for event persistence.
///
/// The per-event CRUD methods back the plain create/read/update/delete
/// surface. `events_for_user`, `save_all` and `delete_by_ids` form the store
/// contract the overlap merger runs against.
pub trait EventRepository {
    fn create_event(&mut self, event: &Event) -> RepoResult<EventId>;
    fn update_event(&mut self, event: &Event) -> RepoResult<()>;
    fn get_event(&self, id: EventId, include_deleted: bool) -> RepoResult<Option<Event>>;
    fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<Event>>;
    fn remove_event(&self, id: EventId) -> RepoResult<()>;
    /// All active events the given user is invited to, ordered ascending by
    /// `start_ms` with ties broken by uuid, invitees eagerly included.
    fn events_for_user(&self, user_id: UserId) -> RepoResult<Vec<Event>>;
    /// Transactional upsert by uuid. Existing rows are updated in place,
    /// absent rows inserted; invitee links are replaced wholesale. Returns
    /// the number of events written.
    fn save_all(&mut self, events: &[Event]) -> RepoResult<usize>;
    /// Tombstones every listed id that still has a live row. Absent or
    /// already-deleted ids are silently skipped. Returns affected row count.
    fn delete_by_ids(&self, ids: &[EventId]) -> RepoResult<usize>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_event_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create_event(&mut self, event: &Event) -> RepoResult<EventId> {
        event.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO events (
                uuid,
                title,
                description,
                start_ms,
                end_ms,
                status,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                event.uuid.to_string(),
                event.title.as_str(),
                event.description.as_deref(),
                event.start_ms,
                event.end_ms,
                event.status.as_str(),
                bool_to_int(event.is_deleted),
            ],
        )?;
        replace_invitee_links(&tx, &event.uuid.to_string(), &event.invitees)?;
        tx.commit()?;

        Ok(event.uuid)
    }

    fn update_event(&mut self, event: &Event) -> RepoResult<()> {
        event.validate()?;

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE events
             SET
                title = ?1,
                description = ?2,
                start_ms = ?3,
                end_ms = ?4,
                status = ?5,
                is_deleted = ?6,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?7;",
            params![
                event.title.as_str(),
                event.description.as_deref(),
                event.start_ms,
                event.end_ms,
                event.status.as_str(),
                bool_to_int(event.is_deleted),
                event.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(event.uuid));
        }

        replace_invitee_links(&tx, &event.uuid.to_string(), &event.invitees)?;
        tx.commit()?;

        Ok(())
    }

    fn get_event(&self, id: EventId, include_deleted: bool) -> RepoResult<Option<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            let mut event = parse_event_row(row)?;
            event.invitees = load_invitees(self.conn, &event.uuid.to_string())?;
            return Ok(Some(event));
        }

        Ok(None)
    }

    fn list_events(&self, query: &EventListQuery) -> RepoResult<Vec<Event>> {
        let mut sql = format!("{EVENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }

        sql.push_str(" ORDER BY start_ms ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut events = Vec::new();

        while let Some(row) = rows.next()? {
            let mut event = parse_event_row(row)?;
            event.invitees = load_invitees(self.conn, &event.uuid.to_string())?;
            events.push(event);
        }

        Ok(events)
    }

    fn remove_event(&self, id: EventId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE events
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn events_for_user(&self, user_id: UserId) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                e.uuid,
                e.title,
                e.description,
                e.start_ms,
                e.end_ms,
                e.status,
                e.is_deleted
             FROM events e
             INNER JOIN event_invitees links ON links.event_uuid = e.uuid
             WHERE links.user_uuid = ?1
               AND e.is_deleted = 0
             ORDER BY e.start_ms ASC, e.uuid ASC;",
        )?;

        let mut rows = stmt.query([user_id.to_string()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            let mut event = parse_event_row(row)?;
            event.invitees = load_invitees(self.conn, &event.uuid.to_string())?;
            events.push(event);
        }

        Ok(events)
    }

    fn save_all(&mut self, events: &[Event]) -> RepoResult<usize> {
        for event in events {
            event.validate()?;
        }

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        for event in events {
            tx.execute(
                "INSERT INTO events (
                    uuid,
                    title,
                    description,
                    start_ms,
                    end_ms,
                    status,
                    is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (uuid) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    start_ms = excluded.start_ms,
                    end_ms = excluded.end_ms,
                    status = excluded.status,
                    is_deleted = excluded.is_deleted,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    event.uuid.to_string(),
                    event.title.as_str(),
                    event.description.as_deref(),
                    event.start_ms,
                    event.end_ms,
                    event.status.as_str(),
                    bool_to_int(event.is_deleted),
                ],
            )?;
            replace_invitee_links(&tx, &event.uuid.to_string(), &event.invitees)?;
        }
        tx.commit()?;

        Ok(events.len())
    }

    fn delete_by_ids(&self, ids: &[EventId]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "UPDATE events
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE is_deleted = 0
               AND uuid IN ({placeholders});"
        );
        let bind_values: Vec<Value> = ids
            .iter()
            .map(|id| Value::Text(id.to_string()))
            .collect();

        let changed = self.conn.execute(&sql, params_from_iter(bind_values))?;
        Ok(changed)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in events.uuid"))
    })?;

    let status_text: String = row.get("status")?;
    let status = EventStatus::parse_str(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid event status `{status_text}` in events.status"
        ))
    })?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in events.is_deleted"
            )));
        }
    };

    let event = Event {
        uuid,
        title: row.get("title")?,
        description: row.get("description")?,
        start_ms: row.get("start_ms")?,
        end_ms: row.get("end_ms")?,
        status,
        invitees: Vec::new(),
        is_deleted,
    };
    event.validate()?;
    Ok(event)
}

fn load_invitees(conn: &Connection, event_uuid: &str) -> RepoResult<Vec<UserId>> {
    let mut stmt = conn.prepare(
        "SELECT user_uuid
         FROM event_invitees
         WHERE event_uuid = ?1
         ORDER BY user_uuid ASC;",
    )?;
    let mut rows = stmt.query([event_uuid])?;
    let mut invitees = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        let user_id = Uuid::parse_str(&value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{value}` in event_invitees.user_uuid"
            ))
        })?;
        invitees.push(user_id);
    }
    Ok(invitees)
}

fn replace_invitee_links(
    tx: &Transaction<'_>,
    event_uuid: &str,
    invitees: &[UserId],
) -> RepoResult<()> {
    tx.execute(
        "DELETE FROM event_invitees WHERE event_uuid = ?1;",
        [event_uuid],
    )?;

    let unique: BTreeSet<UserId> = invitees.iter().copied().collect();
    for user_id in unique {
        tx.execute(
            "INSERT OR IGNORE INTO event_invitees (event_uuid, user_uuid) VALUES (?1, ?2);",
            params![event_uuid, user_id.to_string()],
        )?;
    }

    Ok(())
}

fn ensure_event_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version == 0 {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["events", "users", "event_invitees"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    for column in [
        "uuid",
        "title",
        "description",
        "start_ms",
        "end_ms",
        "status",
        "is_deleted",
        "updated_at",
    ] {
        if !table_has_column(conn, "events", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "events",
                column,
            });
        }
    }

    for column in ["event_uuid", "user_uuid"] {
        if !table_has_column(conn, "event_invitees", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "event_invitees",
                column,
            });
        }
    }

    Ok(())
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

pub(crate) fn table_has_column(
    conn: &Connection,
    table: &str,
    column: &str,
) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
