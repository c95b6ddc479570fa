//! Expected table layout of a browser cookie jar and its verification.

use rusqlite::Connection;
use tracing::debug;

use crate::error::{CookieError, Result};

/// Shape a cookie database must have before any operation may touch it.
///
/// Comparison is exact: the same tables in the same storage order, and the
/// same cookie table columns in the same order. There is no tolerance for
/// drift between browser versions.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    /// Table holding one row per cookie.
    pub table: &'static str,
    pub tables: &'static [&'static str],
    pub columns: &'static [&'static str],
    /// Statements creating an empty jar with exactly this shape.
    pub create_sql: &'static str,
}

impl SchemaDescriptor {
    /// Compare the live database behind `conn` with this descriptor.
    pub fn verify(&self, conn: &Connection) -> Result<()> {
        let tables = live_tables(conn)?;
        if tables != self.tables {
            return Err(CookieError::InvalidSchema {
                what: "Tables",
                expected: to_owned(self.tables),
                actual: tables,
            });
        }

        let columns = live_columns(conn, self.table)?;
        if columns != self.columns {
            return Err(CookieError::InvalidSchema {
                what: "Columns",
                expected: to_owned(self.columns),
                actual: columns,
            });
        }

        debug!(
            "Schema verified: {} tables, {} columns in {}",
            tables.len(),
            columns.len(),
            self.table
        );
        Ok(())
    }

    /// Create the tables of an empty jar.
    pub fn create(&self, conn: &Connection) -> Result<()> {
        conn.execute_batch(self.create_sql)?;
        Ok(())
    }
}

fn to_owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn live_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(tables)
}

fn live_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let stmt = conn.prepare(&format!("SELECT * FROM \"{}\" LIMIT 1", table))?;
    Ok(stmt.column_names().into_iter().map(String::from).collect())
}
