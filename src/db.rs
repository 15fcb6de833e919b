// SQLite local cache for the application document and UI state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::team::migrate::migrate;
use crate::team::model::{to_canonical_json, AppData, TeamId};

/// Document key in the single-row `app_data` table.
const DOCUMENT_KEY: &str = "volleyAppData";

/// SQLite-backed local cache: one serialized application document plus a
/// key-value table for small UI state (last selected match per team, last
/// active tab).
pub struct LocalCache {
    conn: Mutex<Connection>,
}

impl LocalCache {
    /// Open (or create) the cache at `path` and ensure the schema exists.
    /// Pass `":memory:"` for an ephemeral cache (useful for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open local cache at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set cache pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS app_data (
                key      TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ui_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create cache schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the cache connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("cache mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Application document
    // ------------------------------------------------------------------

    /// Serialize and upsert the document. The caller decides whether a
    /// failure is fatal; the persistence gateway logs and keeps going.
    pub fn save_document(&self, data: &AppData) -> Result<()> {
        let json = to_canonical_json(data).context("failed to serialize document")?;
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO app_data (key, document) VALUES (?1, ?2)",
                params![DOCUMENT_KEY, json],
            )
            .context("failed to save document")?;
        Ok(())
    }

    /// Load the cached document. A missing row yields the empty skeleton and
    /// an unparsable row is discarded with a warning; either way the result
    /// is migrated, so this never fails and never returns malformed data.
    pub fn load_document(&self) -> AppData {
        let mut data = match self.raw_document() {
            Ok(Some(json)) => match serde_json::from_str::<AppData>(&json) {
                Ok(data) => data,
                Err(err) => {
                    warn!(error = %err, "cached document is unparsable, starting fresh");
                    AppData::skeleton()
                }
            },
            Ok(None) => AppData::skeleton(),
            Err(err) => {
                warn!(error = %err, "failed to read cached document, starting fresh");
                AppData::skeleton()
            }
        };
        migrate(&mut data);
        data
    }

    /// The stored serialized form, untouched. The reconciler uses this for
    /// its existence and byte-equality checks.
    pub fn raw_document(&self) -> Result<Option<String>> {
        let json = self
            .conn()
            .query_row(
                "SELECT document FROM app_data WHERE key = ?1",
                params![DOCUMENT_KEY],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("failed to query cached document")?;
        Ok(json)
    }

    /// Drop the cached document (remote-deletion reset path).
    pub fn clear_document(&self) -> Result<()> {
        self.conn()
            .execute("DELETE FROM app_data WHERE key = ?1", params![DOCUMENT_KEY])
            .context("failed to clear cached document")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // UI state
    // ------------------------------------------------------------------

    fn set_ui_state(&self, key: &str, value: &str) -> Result<()> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO ui_state (key, value) VALUES (?1, ?2)",
                params![key, value],
            )
            .context("failed to save ui state")?;
        Ok(())
    }

    fn get_ui_state(&self, key: &str) -> Result<Option<String>> {
        self.conn()
            .query_row(
                "SELECT value FROM ui_state WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("failed to query ui state")
    }

    fn remove_ui_state(&self, key: &str) -> Result<()> {
        self.conn()
            .execute("DELETE FROM ui_state WHERE key = ?1", params![key])
            .context("failed to remove ui state")?;
        Ok(())
    }

    fn last_selected_match_key(team_id: TeamId) -> String {
        format!("last_selected_match_{team_id}")
    }

    /// Remember which match a team's views were last focused on.
    pub fn set_last_selected_match(&self, team_id: TeamId, match_id: i64) -> Result<()> {
        self.set_ui_state(&Self::last_selected_match_key(team_id), &match_id.to_string())
    }

    pub fn last_selected_match(&self, team_id: TeamId) -> Result<Option<i64>> {
        let value = self.get_ui_state(&Self::last_selected_match_key(team_id))?;
        Ok(value.and_then(|v| v.parse().ok()))
    }

    /// Forget the remembered match, typically after deleting it.
    pub fn clear_last_selected_match(&self, team_id: TeamId) -> Result<()> {
        self.remove_ui_state(&Self::last_selected_match_key(team_id))
    }

    pub fn set_last_active_tab(&self, tab: &str) -> Result<()> {
        self.set_ui_state("last_active_tab", tab)
    }

    pub fn last_active_tab(&self) -> Result<Option<String>> {
        self.get_ui_state("last_active_tab")
    }
}
