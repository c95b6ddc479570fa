//! Schema-checked access to a browser cookie jar.
//!
//! [`CookieManager`] owns the path of one cookie database and runs every
//! operation through its own short-lived connection. What the SQL looks like
//! is decided by a [`CookieDialect`], one per browser family; the manager only
//! knows the shape of the statements a dialect hands back.

use std::path::{Path, PathBuf};

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, Row};
use tracing::{debug, warn};

use crate::cookie::{CookieRecord, NewCookie};
use crate::error::{CookieError, Result};
use crate::platform::{expand_home, DefaultPaths, Platform};
use crate::schema::SchemaDescriptor;

/// Upper bound on rows scanned by [`CookieManager::find_cookies`].
pub const FIND_CANDIDATE_LIMIT: usize = 100_000;

/// Immutable description of one browser's cookie storage.
#[derive(Debug)]
pub struct BrowserProfile {
    pub name: &'static str,
    pub schema: SchemaDescriptor,
    pub paths: DefaultPaths,
}

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCommand {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlCommand {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    fn execute(&self, conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(&self.sql, rusqlite::params_from_iter(self.params.iter()))
    }
}

/// Which rows a full select returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter {
    All,
    RowId(i64),
}

/// Read a text column without failing on what browsers actually store:
/// NULL reads as empty, BLOBs and invalid UTF-8 are decoded lossily and
/// numbers are formatted.
pub fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
    })
}

/// Browser specific pieces of SQL the manager runs.
pub trait CookieDialect: Send + Sync {
    fn profile(&self) -> &'static BrowserProfile;

    /// Adjust the expanded default path before its existence is checked.
    fn locate_profile(&self, expanded: PathBuf) -> Result<PathBuf> {
        Ok(expanded)
    }

    /// Insert one cookie, computing creation and expiry times in the
    /// browser's native encoding.
    fn build_insert(&self, cookie: &NewCookie) -> Result<SqlCommand>;

    /// Delete cookies matching `host` and `name` exactly.
    fn build_delete(&self, host: &str, name: &str) -> SqlCommand;

    /// Select at most `limit` rows as `(rowid, host, name, value)`.
    fn build_select_candidates(&self, limit: usize) -> SqlCommand;

    /// Select full rows, in the column order `row_to_record` expects.
    fn build_select(&self, filter: RowFilter) -> SqlCommand;

    fn row_to_record(&self, row: &Row<'_>) -> rusqlite::Result<CookieRecord>;
}

/// Case-insensitive substring filters of a cookie search.
///
/// A row matches when any supplied filter matches; empty filters are ignored.
#[derive(Debug, Clone, Default)]
pub struct CookieQuery {
    host: String,
    name: String,
    value: String,
}

impl CookieQuery {
    pub fn new(host: &str, name: &str, value: &str) -> Self {
        Self {
            host: host.to_lowercase(),
            name: name.to_lowercase(),
            value: value.to_lowercase(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty() && self.name.is_empty() && self.value.is_empty()
    }

    pub fn matches(&self, host: &str, name: &str, value: &str) -> bool {
        (!self.host.is_empty() && host.to_lowercase().contains(&self.host))
            || (!self.name.is_empty() && name.to_lowercase().contains(&self.name))
            || (!self.value.is_empty() && value.to_lowercase().contains(&self.value))
    }
}

struct Candidate {
    rowid: i64,
    host: String,
    name: String,
    value: String,
}

pub struct CookieManager {
    dialect: Box<dyn CookieDialect>,
    db: PathBuf,
}

impl CookieManager {
    /// Open a cookie jar, at `db` or at the browser's default location, and
    /// verify its schema.
    pub fn open(dialect: Box<dyn CookieDialect>, db: Option<PathBuf>) -> Result<Self> {
        let db = match db {
            Some(db) => db,
            None => Self::find_db(dialect.as_ref())?,
        };

        if !db.exists() {
            return Err(CookieError::MissingDatabase(db.display().to_string()));
        }

        let manager = Self { dialect, db };
        manager.verify_schema()?;
        debug!("Opened {} cookies at {:?}", manager.name(), manager.db);
        Ok(manager)
    }

    /// Default cookie database of `dialect` on the running platform.
    pub fn find_db(dialect: &dyn CookieDialect) -> Result<PathBuf> {
        let platform = Platform::current()?;
        let template = dialect.profile().paths.for_platform(platform);
        let cookies_path = dialect.locate_profile(expand_home(template)?)?;

        if !cookies_path.exists() {
            return Err(CookieError::MissingDatabase(cookies_path.display().to_string()));
        }

        debug!("Found {} cookies at: {:?}", dialect.profile().name, cookies_path);
        Ok(cookies_path)
    }

    pub fn verify_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        self.dialect.profile().schema.verify(&conn)
    }

    pub fn name(&self) -> &'static str {
        self.dialect.profile().name
    }

    pub fn path(&self) -> &Path {
        &self.db
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open_with_flags(
            &self.db,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    fn insert(&self, conn: &Connection, cookie: &NewCookie) -> Result<()> {
        let command = self
            .dialect
            .build_insert(cookie)
            .map_err(CookieError::operation)?;
        command.execute(conn).map_err(CookieError::operation)?;
        Ok(())
    }

    fn remove(&self, conn: &Connection, host: &str, name: &str) -> Result<()> {
        let removed = self
            .dialect
            .build_delete(host, name)
            .execute(conn)
            .map_err(CookieError::operation)?;

        if removed == 0 {
            return Err(CookieError::Operation(format!(
                "No cookie named {} found for host {}",
                name, host
            )));
        }
        debug!("Deleted {} row(s) for {}:{}", removed, host, name);
        Ok(())
    }

    fn fetch(&self, conn: &Connection, filter: RowFilter) -> rusqlite::Result<Vec<CookieRecord>> {
        let command = self.dialect.build_select(filter);
        let mut stmt = conn.prepare(&command.sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(command.params.iter()), |row| {
            self.dialect.row_to_record(row)
        })?;
        rows.collect()
    }

    fn candidates(&self, conn: &Connection) -> rusqlite::Result<Vec<Candidate>> {
        let command = self.dialect.build_select_candidates(FIND_CANDIDATE_LIMIT);
        let mut stmt = conn.prepare(&command.sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(command.params.iter()), |row| {
            Ok(Candidate {
                rowid: row.get(0)?,
                host: text_column(row, 1)?,
                name: text_column(row, 2)?,
                value: text_column(row, 3)?,
            })
        })?;
        rows.collect()
    }

    /// Add a cookie to the database.
    pub fn add_cookie(&self, cookie: &NewCookie) -> Result<()> {
        let mut conn = self.connect().map_err(CookieError::operation)?;
        let tx = conn.transaction().map_err(CookieError::operation)?;

        self.insert(&tx, cookie)?;
        tx.commit().map_err(CookieError::commit)?;

        debug!("Added cookie {}:{}", cookie.host, cookie.name);
        Ok(())
    }

    /// Remove the cookie whose host and name match exactly.
    pub fn delete_cookie(&self, host: &str, name: &str) -> Result<()> {
        let mut conn = self.connect().map_err(CookieError::operation)?;
        let tx = conn.transaction().map_err(CookieError::operation)?;

        self.remove(&tx, host, name)?;
        tx.commit().map_err(CookieError::commit)?;
        Ok(())
    }

    /// Delete and re-add a cookie.
    ///
    /// With `ignore_missing` a failed delete is logged and the insert still
    /// happens; otherwise the delete failure is returned and nothing is
    /// inserted.
    pub fn update_cookie(&self, cookie: &NewCookie, ignore_missing: bool) -> Result<()> {
        let mut conn = self.connect().map_err(CookieError::operation)?;
        let tx = conn.transaction().map_err(CookieError::operation)?;

        if let Err(err) = self.remove(&tx, &cookie.host, &cookie.name) {
            if !ignore_missing {
                return Err(err);
            }
            warn!("Delete before update failed, adding anyway: {}", err);
        }

        self.insert(&tx, cookie)?;
        tx.commit().map_err(CookieError::commit)?;

        debug!("Updated cookie {}:{}", cookie.host, cookie.name);
        Ok(())
    }

    /// Search cookies by host, name or value.
    ///
    /// Every filter is a case-insensitive substring match and a cookie is
    /// returned when any of the given filters matches. At least one filter
    /// must be non-empty.
    pub fn find_cookies(&self, host: &str, name: &str, value: &str) -> Result<Vec<CookieRecord>> {
        let query = CookieQuery::new(host, name, value);
        if query.is_empty() {
            return Err(CookieError::InvalidQuery);
        }

        let conn = self.connect().map_err(CookieError::operation)?;
        let candidates = self.candidates(&conn).map_err(CookieError::operation)?;

        let result_ids: Vec<i64> = candidates
            .iter()
            .filter(|c| query.matches(&c.host, &c.name, &c.value))
            .map(|c| c.rowid)
            .collect();
        debug!(
            "{} of {} candidate rows matched",
            result_ids.len(),
            candidates.len()
        );

        let mut results = Vec::with_capacity(result_ids.len());
        for rowid in result_ids {
            let mut rows = self
                .fetch(&conn, RowFilter::RowId(rowid))
                .map_err(CookieError::operation)?;
            match rows.pop() {
                Some(record) => results.push(record),
                None => warn!("Row {} disappeared during search", rowid),
            }
        }

        Ok(results)
    }

    /// Every cookie in the database.
    pub fn dump(&self) -> Result<Vec<CookieRecord>> {
        let conn = self.connect().map_err(CookieError::operation)?;
        let records = self
            .fetch(&conn, RowFilter::All)
            .map_err(CookieError::operation)?;
        debug!("Dumped {} cookies from {}", records.len(), self.name());
        Ok(records)
    }

    /// Copy the database next to itself with a `.backup` suffix.
    pub fn backup(&self) -> Result<PathBuf> {
        let mut file_name = self
            .db
            .file_name()
            .map(|n| n.to_os_string())
            .ok_or_else(|| CookieError::MissingDatabase(self.db.display().to_string()))?;
        file_name.push(".backup");

        let backup_path = self.db.with_file_name(file_name);
        std::fs::copy(&self.db, &backup_path)?;
        debug!("Backed up {:?} to {:?}", self.db, backup_path);
        Ok(backup_path)
    }
}
