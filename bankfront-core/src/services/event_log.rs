//! Event log - structured frontend events in DuckDB
//!
//! Events record which form was submitted and how it ended, keyed by the
//! submission's idempotency token. Amounts, account numbers, names and
//! credentials are never stored.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::Utc;
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::config::Platform;
use crate::domain::{FormKind, IdempotencyToken};
use crate::log_migrations::LOG_MIGRATIONS;

const DB_FILENAME: &str = "events.duckdb";

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Millisecond timestamp in the upper bits, per-process counter in the lower 16
fn generate_id() -> u64 {
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms().max(0) as u64) << 16) | counter
}

/// Where an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Server,
    Cli,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Server => "server",
            EntryPoint::Cli => "cli",
        }
    }
}

/// An event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<FormKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_uuid: Option<IdempotencyToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Event {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            form: None,
            request_uuid: None,
            command: None,
            error_message: None,
        }
    }

    /// `{form}_{outcome}`, e.g. `payment_failed`
    pub fn for_form(form: FormKind, outcome: &str) -> Self {
        Self::new(format!("{}_{}", form.as_str(), outcome)).with_form(form)
    }

    pub fn with_form(mut self, form: FormKind) -> Self {
        self.form = Some(form);
        self
    }

    pub fn with_request(mut self, token: IdempotencyToken) -> Self {
        self.request_uuid = Some(token);
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// An event as stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub event: String,
    pub form: Option<String>,
    pub request_uuid: Option<String>,
    pub command: Option<String>,
    pub error_message: Option<String>,
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp, entry_point, app_version, platform, \
     event, form, request_uuid, command, error_message FROM sys_events";

fn entry_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<EventEntry> {
    Ok(EventEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        event: row.get(5)?,
        form: row.get(6)?,
        request_uuid: row.get(7)?,
        command: row.get(8)?,
        error_message: row.get(9)?,
    })
}

/// Service owning `events.duckdb`
pub struct EventLogService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    entry_point: EntryPoint,
    app_version: String,
    platform: String,
}

impl EventLogService {
    /// Open or create the event log in `dir` and apply pending migrations
    pub fn new(
        dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
        platform: Option<Platform>,
    ) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join(DB_FILENAME);
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            entry_point,
            app_version: app_version.into(),
            platform: platform
                .map(|p| p.display_name().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        };
        service.run_migrations()?;
        Ok(service)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.connection()?;

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !table_exists {
            if let Some((name, sql)) = LOG_MIGRATIONS.iter().find(|(n, _)| *n == "000_migrations.sql") {
                conn.execute_batch(sql)?;
                conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in LOG_MIGRATIONS.iter().filter(|(n, _)| *n != "000_migrations.sql") {
            if !applied.iter().any(|a| a == name) {
                conn.execute_batch(sql)?;
                conn.execute("INSERT INTO sys_migrations (migration_name) VALUES (?)", [name])?;
            }
        }
        Ok(())
    }

    /// Record an event; entry point, version and platform come from the service
    pub fn log(&self, event: Event) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            r#"
            INSERT INTO sys_events (
                id, timestamp, entry_point, app_version, platform,
                event, form, request_uuid, command, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                self.entry_point.as_str(),
                &self.app_version,
                &self.platform,
                &event.event,
                event.form.map(|f| f.as_str()),
                event.request_uuid.map(|t| t.to_string()),
                &event.command,
                &event.error_message,
            ],
        )?;
        Ok(())
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        self.log(Event::new(event))
    }

    /// Record a CLI command run
    pub fn log_command(&self, command: &str) -> Result<()> {
        self.log(Event::new("command_executed").with_command(command))
    }

    fn query<P: duckdb::Params>(&self, sql: &str, params: P) -> Result<Vec<EventEntry>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map(params, entry_from_row)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(entries)
    }

    /// Most recent events first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<EventEntry>> {
        self.query(
            &format!("{} ORDER BY timestamp DESC, id DESC LIMIT ?", SELECT_COLUMNS),
            [limit as i64],
        )
    }

    /// Most recent events that carry an error
    pub fn get_errors(&self, limit: usize) -> Result<Vec<EventEntry>> {
        self.query(
            &format!(
                "{} WHERE error_message IS NOT NULL ORDER BY timestamp DESC, id DESC LIMIT ?",
                SELECT_COLUMNS
            ),
            [limit as i64],
        )
    }

    /// Every event recorded for one submission, oldest first
    pub fn find_by_request(&self, token: IdempotencyToken) -> Result<Vec<EventEntry>> {
        self.query(
            &format!("{} WHERE request_uuid = ? ORDER BY timestamp, id", SELECT_COLUMNS),
            [token.to_string()],
        )
    }

    pub fn count(&self) -> Result<u64> {
        let conn = self.connection()?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete events older than `timestamp_ms`
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM sys_events WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
