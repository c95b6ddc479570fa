//! Firefox `cookies.sqlite`.
//!
//! `expiry` is seconds since 1970, `creationTime` and `lastAccessed` are
//! micro-seconds since 1970.

use std::path::PathBuf;

use rusqlite::Row;
use serde_json::json;
use tracing::debug;

use crate::cookie::{CookieRecord, NewCookie};
use crate::error::{CookieError, Result};
use crate::manager::{text_column, BrowserProfile, CookieDialect, RowFilter, SqlCommand};
use crate::platform::DefaultPaths;
use crate::schema::SchemaDescriptor;
use crate::timestamp::{self, Epoch};

const COOKIES_FILE: &str = "cookies.sqlite";
const CREATION_LENGTH: u32 = 16;
const EXPIRY_LENGTH: u32 = 10;

const CREATE_SQL: &str = "
CREATE TABLE moz_cookies (
    id INTEGER PRIMARY KEY,
    originAttributes TEXT NOT NULL DEFAULT '',
    name TEXT,
    value TEXT,
    host TEXT,
    path TEXT,
    expiry INTEGER,
    lastAccessed INTEGER,
    creationTime INTEGER,
    isSecure INTEGER,
    isHttpOnly INTEGER,
    inBrowserElement INTEGER DEFAULT 0,
    sameSite INTEGER DEFAULT 0,
    rawSameSite INTEGER DEFAULT 0,
    schemeMap INTEGER DEFAULT 0,
    isPartitionedAttributeSet INTEGER DEFAULT 0,
    CONSTRAINT moz_uniqueid UNIQUE (name, host, path, originAttributes));
";

pub static FIREFOX: BrowserProfile = BrowserProfile {
    name: "Firefox",
    schema: SchemaDescriptor {
        table: "moz_cookies",
        tables: &["moz_cookies"],
        columns: &[
            "id",
            "originAttributes",
            "name",
            "value",
            "host",
            "path",
            "expiry",
            "lastAccessed",
            "creationTime",
            "isSecure",
            "isHttpOnly",
            "inBrowserElement",
            "sameSite",
            "rawSameSite",
            "schemeMap",
            "isPartitionedAttributeSet",
        ],
        create_sql: CREATE_SQL,
    },
    paths: DefaultPaths {
        linux: "~/.mozilla/firefox",
        mac: "~/Library/Application Support/Firefox/Profiles",
        windows: "~/AppData/Roaming/Mozilla/Firefox/Profiles",
    },
};

const SELECT_COLUMNS: &str = "id, host, name, value, path, expiry, isSecure, isHttpOnly, \
     creationTime, lastAccessed, sameSite, originAttributes";

/// Extra insert fields: `same_site`, `scheme_map`, `origin_attributes`.
pub struct Firefox;

impl CookieDialect for Firefox {
    fn profile(&self) -> &'static BrowserProfile {
        &FIREFOX
    }

    /// Pick the default profile's `cookies.sqlite` inside the profiles directory.
    fn locate_profile(&self, expanded: PathBuf) -> Result<PathBuf> {
        if !expanded.is_dir() {
            return Err(CookieError::MissingDatabase(expanded.display().to_string()));
        }

        let mut profiles = Vec::new();
        for entry in std::fs::read_dir(&expanded)? {
            let profile_path = entry?.path();
            let name = profile_path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if name.contains("default")
                && profile_path.is_dir()
                && profile_path.join(COOKIES_FILE).exists()
            {
                profiles.push((name, profile_path));
            }
        }

        // "default-release" before plain "default"
        profiles.sort_by_key(|(name, _)| (!name.contains("default-release"), name.clone()));

        match profiles.into_iter().next() {
            Some((_, profile)) => {
                debug!("Using Firefox profile at: {:?}", profile);
                Ok(profile.join(COOKIES_FILE))
            }
            None => Err(CookieError::MissingDatabase(
                expanded.join(COOKIES_FILE).display().to_string(),
            )),
        }
    }

    fn build_insert(&self, cookie: &NewCookie) -> Result<SqlCommand> {
        let same_site = cookie
            .extra_i64("same_site", 0)
            .map_err(CookieError::Operation)?;
        let scheme_map = cookie
            .extra_i64("scheme_map", 0)
            .map_err(CookieError::Operation)?;
        let origin_attributes = cookie
            .extra_str("origin_attributes", "")
            .map_err(CookieError::Operation)?;

        let created = timestamp::current_time(Epoch::Unix, CREATION_LENGTH)?;
        let expiry = timestamp::expire_time(Epoch::Unix, EXPIRY_LENGTH, cookie.expires_in);

        Ok(SqlCommand::new(
            "INSERT INTO moz_cookies (originAttributes, name, value, host, path, expiry, \
             lastAccessed, creationTime, isSecure, isHttpOnly, inBrowserElement, sameSite, \
             rawSameSite, schemeMap, isPartitionedAttributeSet) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?13, 0)",
        )
        .param(origin_attributes)
        .param(cookie.name.clone())
        .param(cookie.value.clone())
        .param(cookie.host.clone())
        .param(cookie.path.clone())
        .param(expiry)
        .param(created)
        .param(created)
        .param(cookie.secure as i64)
        .param(cookie.http_only as i64)
        .param(same_site)
        .param(same_site)
        .param(scheme_map))
    }

    fn build_delete(&self, host: &str, name: &str) -> SqlCommand {
        SqlCommand::new("DELETE FROM moz_cookies WHERE host = ?1 AND name = ?2")
            .param(host.to_string())
            .param(name.to_string())
    }

    fn build_select_candidates(&self, limit: usize) -> SqlCommand {
        SqlCommand::new("SELECT id, host, name, value FROM moz_cookies LIMIT ?1")
            .param(limit as i64)
    }

    fn build_select(&self, filter: RowFilter) -> SqlCommand {
        match filter {
            RowFilter::All => {
                SqlCommand::new(format!("SELECT {} FROM moz_cookies", SELECT_COLUMNS))
            }
            RowFilter::RowId(id) => SqlCommand::new(format!(
                "SELECT {} FROM moz_cookies WHERE id = ?1",
                SELECT_COLUMNS
            ))
            .param(id),
        }
    }

    fn row_to_record(&self, row: &Row<'_>) -> rusqlite::Result<CookieRecord> {
        let mut record = CookieRecord::new(
            text_column(row, 1)?,
            text_column(row, 2)?,
            text_column(row, 3)?,
        );
        record.path = row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| "/".to_string());
        record.expiry = row.get(5)?;
        record.secure = row.get::<_, Option<i64>>(6)?.unwrap_or(0) != 0;
        record.http_only = row.get::<_, Option<i64>>(7)?.unwrap_or(0) != 0;

        let creation_time: Option<i64> = row.get(8)?;
        let extra = &mut record.extra;
        extra.insert("rowid".into(), json!(row.get::<_, i64>(0)?));
        extra.insert("creation_time".into(), json!(creation_time));
        extra.insert("last_accessed".into(), json!(row.get::<_, Option<i64>>(9)?));
        extra.insert("same_site".into(), json!(row.get::<_, Option<i64>>(10)?));
        extra.insert("origin_attributes".into(), json!(text_column(row, 11)?));
        if let Some(created) = creation_time {
            extra.insert("creation_secs".into(), json!(timestamp::micros_to_secs(created)));
        }

        Ok(record)
    }
}
