//! Chromium family `Cookies` database (cookie DB version 24).
//!
//! Times are micro-seconds since 1601-01-01 UTC, 17 digits wide.

use rusqlite::types::Value;
use rusqlite::Row;
use serde_json::json;

use crate::cookie::{CookieRecord, NewCookie};
use crate::error::{CookieError, Result};
use crate::manager::{text_column, BrowserProfile, CookieDialect, RowFilter, SqlCommand};
use crate::platform::DefaultPaths;
use crate::schema::SchemaDescriptor;
use crate::timestamp::{self, Epoch, WINDOWS_EPOCH_OFFSET_MICROS};

const TIME_LENGTH: u32 = 17;

/// Cookie SameSite values matching Chromium's `CookieSameSite` enum.
pub mod samesite {
    pub const UNSPECIFIED: i64 = -1;
    pub const NO_RESTRICTION: i64 = 0;
    pub const LAX: i64 = 1;
    pub const STRICT: i64 = 2;
}

/// Cookie priority levels matching Chromium's `CookiePriority` enum.
pub mod priority {
    pub const LOW: i64 = 0;
    pub const MEDIUM: i64 = 1;
    pub const HIGH: i64 = 2;
}

const COLUMNS: &[&str] = &[
    "creation_utc",
    "host_key",
    "top_frame_site_key",
    "name",
    "value",
    "encrypted_value",
    "path",
    "expires_utc",
    "is_secure",
    "is_httponly",
    "last_access_utc",
    "has_expires",
    "is_persistent",
    "priority",
    "samesite",
    "source_scheme",
    "source_port",
    "last_update_utc",
    "source_type",
    "has_cross_site_ancestor",
];

const CREATE_SQL: &str = "
CREATE TABLE meta(key LONGVARCHAR NOT NULL UNIQUE PRIMARY KEY, value LONGVARCHAR);
CREATE TABLE cookies(
    creation_utc INTEGER NOT NULL,
    host_key TEXT NOT NULL,
    top_frame_site_key TEXT NOT NULL,
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    encrypted_value BLOB NOT NULL,
    path TEXT NOT NULL,
    expires_utc INTEGER NOT NULL,
    is_secure INTEGER NOT NULL,
    is_httponly INTEGER NOT NULL,
    last_access_utc INTEGER NOT NULL,
    has_expires INTEGER NOT NULL,
    is_persistent INTEGER NOT NULL,
    priority INTEGER NOT NULL,
    samesite INTEGER NOT NULL,
    source_scheme INTEGER NOT NULL,
    source_port INTEGER NOT NULL,
    last_update_utc INTEGER NOT NULL,
    source_type INTEGER NOT NULL,
    has_cross_site_ancestor INTEGER NOT NULL);
CREATE UNIQUE INDEX cookies_unique_index ON cookies(host_key, top_frame_site_key, has_cross_site_ancestor, name, path, source_scheme, source_port);
INSERT INTO meta(key, value) VALUES('version', '24'), ('last_compatible_version', '24');
";

pub static CHROME: BrowserProfile = BrowserProfile {
    name: "Chrome",
    schema: SchemaDescriptor {
        table: "cookies",
        tables: &["meta", "cookies"],
        columns: COLUMNS,
        create_sql: CREATE_SQL,
    },
    paths: DefaultPaths {
        linux: "~/.config/google-chrome/Default/Cookies",
        mac: "~/Library/Application Support/Google/Chrome/Default/Cookies",
        windows: "~/AppData/Local/Google/Chrome/User Data/Default/Network/Cookies",
    },
};

const SELECT_COLUMNS: &str = "rowid, host_key, name, value, path, expires_utc, is_secure, \
     is_httponly, creation_utc, last_access_utc, samesite, priority, encrypted_value";

/// Chromium and its derivatives.
///
/// Extra insert fields: `same_site`, `priority`, `source_scheme`,
/// `source_port`, `top_frame_site_key`.
pub struct Chrome;

/// Chromium time to unix seconds, `None` for the "no expiry" zero.
fn to_unix_secs(chrome_time: i64) -> Option<f64> {
    if chrome_time <= WINDOWS_EPOCH_OFFSET_MICROS {
        return None;
    }
    Some(timestamp::micros_to_secs(chrome_time - WINDOWS_EPOCH_OFFSET_MICROS))
}

impl CookieDialect for Chrome {
    fn profile(&self) -> &'static BrowserProfile {
        &CHROME
    }

    fn build_insert(&self, cookie: &NewCookie) -> Result<SqlCommand> {
        let same_site = cookie
            .extra_i64("same_site", samesite::UNSPECIFIED)
            .map_err(CookieError::Operation)?;
        let priority = cookie
            .extra_i64("priority", priority::MEDIUM)
            .map_err(CookieError::Operation)?;
        let source_scheme = cookie
            .extra_i64("source_scheme", 0)
            .map_err(CookieError::Operation)?;
        let source_port = cookie
            .extra_i64("source_port", -1)
            .map_err(CookieError::Operation)?;
        let top_frame_site_key = cookie
            .extra_str("top_frame_site_key", "")
            .map_err(CookieError::Operation)?;

        let created = timestamp::current_time(Epoch::Windows, TIME_LENGTH)?;
        let expires = timestamp::expire_time(Epoch::Windows, TIME_LENGTH, cookie.expires_in);

        Ok(SqlCommand::new(format!(
            "INSERT INTO cookies ({}) VALUES ({})",
            COLUMNS.join(", "),
            (1..=COLUMNS.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .param(created)
        .param(cookie.host.clone())
        .param(top_frame_site_key)
        .param(cookie.name.clone())
        .param(cookie.value.clone())
        .param(Value::Blob(Vec::new()))
        .param(cookie.path.clone())
        .param(expires)
        .param(cookie.secure as i64)
        .param(cookie.http_only as i64)
        .param(created)
        .param(1i64)
        .param(1i64)
        .param(priority)
        .param(same_site)
        .param(source_scheme)
        .param(source_port)
        .param(created)
        .param(0i64)
        .param(0i64))
    }

    fn build_delete(&self, host: &str, name: &str) -> SqlCommand {
        SqlCommand::new("DELETE FROM cookies WHERE host_key = ?1 AND name = ?2")
            .param(host.to_string())
            .param(name.to_string())
    }

    fn build_select_candidates(&self, limit: usize) -> SqlCommand {
        SqlCommand::new("SELECT rowid, host_key, name, value FROM cookies LIMIT ?1")
            .param(limit as i64)
    }

    fn build_select(&self, filter: RowFilter) -> SqlCommand {
        match filter {
            RowFilter::All => SqlCommand::new(format!("SELECT {} FROM cookies", SELECT_COLUMNS)),
            RowFilter::RowId(rowid) => SqlCommand::new(format!(
                "SELECT {} FROM cookies WHERE rowid = ?1",
                SELECT_COLUMNS
            ))
            .param(rowid),
        }
    }

    fn row_to_record(&self, row: &Row<'_>) -> rusqlite::Result<CookieRecord> {
        let mut record = CookieRecord::new(
            text_column(row, 1)?,
            text_column(row, 2)?,
            text_column(row, 3)?,
        );
        let expires_utc: i64 = row.get(5)?;
        let creation_utc: i64 = row.get(8)?;
        let encrypted: Vec<u8> = row.get(12)?;

        record.path = row.get(4)?;
        record.expiry = Some(expires_utc);
        record.secure = row.get::<_, i64>(6)? != 0;
        record.http_only = row.get::<_, i64>(7)? != 0;

        let extra = &mut record.extra;
        extra.insert("rowid".into(), json!(row.get::<_, i64>(0)?));
        extra.insert("creation_utc".into(), json!(creation_utc));
        extra.insert("last_access_utc".into(), json!(row.get::<_, i64>(9)?));
        extra.insert("same_site".into(), json!(row.get::<_, i64>(10)?));
        extra.insert("priority".into(), json!(row.get::<_, i64>(11)?));
        extra.insert("encrypted".into(), json!(!encrypted.is_empty()));
        if let Some(secs) = to_unix_secs(creation_utc) {
            extra.insert("creation_secs".into(), json!(secs));
        }
        if let Some(secs) = to_unix_secs(expires_utc) {
            extra.insert("expires_secs".into(), json!(secs));
        }

        Ok(record)
    }
}
