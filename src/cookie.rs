use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Browser specific fields carried next to the common ones.
pub type Extra = BTreeMap<String, Value>;

/// One cookie row, converted from a browser's native layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub host: String,
    pub name: String,
    pub value: String,
    pub path: String,
    /// Expiry in the browser's own integer encoding.
    pub expiry: Option<i64>,
    pub secure: bool,
    pub http_only: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

impl CookieRecord {
    pub fn new(host: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            expiry: None,
            secure: false,
            http_only: false,
            extra: Extra::new(),
        }
    }
}

/// Cookie to be written by `add_cookie` or `update_cookie`.
#[derive(Debug, Clone)]
pub struct NewCookie {
    pub host: String,
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires_in: chrono::Duration,
    pub secure: bool,
    pub http_only: bool,
    pub extra: Extra,
}

impl NewCookie {
    pub fn new(host: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            expires_in: chrono::Duration::days(1),
            secure: false,
            http_only: false,
            extra: Extra::new(),
        }
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn expires_in(mut self, expires_in: chrono::Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Integer extra field, falling back to `default` when unset.
    pub fn extra_i64(&self, key: &str, default: i64) -> std::result::Result<i64, String> {
        match self.extra.get(key) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| format!("extra field {} must be an integer, got {}", key, value)),
        }
    }

    /// String extra field, falling back to `default` when unset.
    pub fn extra_str(&self, key: &str, default: &str) -> std::result::Result<String, String> {
        match self.extra.get(key) {
            None => Ok(default.to_string()),
            Some(value) => value
                .as_str()
                .map(String::from)
                .ok_or_else(|| format!("extra field {} must be a string, got {}", key, value)),
        }
    }
}

/// Write cookie records to a JSON file.
pub fn export_to_json(records: &[CookieRecord], output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(output_path, json)?;
    Ok(())
}
