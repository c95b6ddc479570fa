// Integration tests for cookie-eater
// Run with: cargo test --test integration_test

use std::path::{Path, PathBuf};
use std::process::Command;

use cookie_eater::{Browser, CookieDialect, CookieError, CookieManager, NewCookie};
use rusqlite::Connection;
use tempfile::TempDir;

fn create_jar(browser: Browser) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("cookies.db");
    let conn = Connection::open(&path).expect("Failed to create database");
    browser
        .dialect()
        .profile()
        .schema
        .create(&conn)
        .expect("Failed to create schema");
    (dir, path)
}

fn open(browser: Browser, path: &Path) -> CookieManager {
    CookieManager::open(browser.dialect(), Some(path.to_path_buf())).expect("Failed to open jar")
}

#[test]
fn test_exact_schema_opens() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);
        assert_eq!(jar.name(), browser.name());
        assert_eq!(jar.path(), path.as_path());
    }
}

#[test]
fn test_missing_column_is_rejected() {
    let (_dir, path) = create_jar(Browser::Firefox);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "ALTER TABLE moz_cookies RENAME TO old_cookies;
         CREATE TABLE moz_cookies (id INTEGER PRIMARY KEY, name TEXT, value TEXT, host TEXT);
         DROP TABLE old_cookies;",
    )
    .unwrap();
    drop(conn);

    let err = CookieManager::open(Browser::Firefox.dialect(), Some(path))
        .err()
        .expect("schema should be rejected");
    assert!(matches!(err, CookieError::InvalidSchema { what: "Columns", .. }));
}

#[test]
fn test_missing_table_is_rejected() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("DROP TABLE meta;").unwrap();
    drop(conn);

    let err = CookieManager::open(Browser::Chrome.dialect(), Some(path))
        .err()
        .expect("schema should be rejected");
    assert!(matches!(err, CookieError::InvalidSchema { what: "Tables", .. }));
}

#[test]
fn test_wrong_browser_is_rejected() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let err = CookieManager::open(Browser::Firefox.dialect(), Some(path))
        .err()
        .expect("schema should be rejected");
    assert!(matches!(err, CookieError::InvalidSchema { .. }));
}

#[test]
fn test_add_then_find() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);

        jar.add_cookie(&NewCookie::new("example.com", "sid", "abc123"))
            .unwrap();

        let found = jar.find_cookies("example.com", "", "").unwrap();
        assert_eq!(found.len(), 1, "{}", browser);
        assert_eq!(found[0].host, "example.com");
        assert_eq!(found[0].name, "sid");
        assert_eq!(found[0].value, "abc123");
        assert_eq!(found[0].path, "/");
    }
}

#[test]
fn test_find_by_value_is_case_insensitive() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);
        jar.add_cookie(&NewCookie::new("a.example", "token", "SeCrEt-Value"))
            .unwrap();
        jar.add_cookie(&NewCookie::new("b.example", "other", "plain"))
            .unwrap();

        let found = jar.find_cookies("", "", "secret").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "token");
    }
}

#[test]
fn test_delete_then_find() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);
        jar.add_cookie(&NewCookie::new("example.com", "sid", "abc123"))
            .unwrap();

        jar.delete_cookie("example.com", "sid").unwrap();

        assert!(jar.find_cookies("example.com", "sid", "").unwrap().is_empty());
    }
}

#[test]
fn test_delete_requires_exact_host() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let jar = open(Browser::Chrome, &path);
    jar.add_cookie(&NewCookie::new("www.example.com", "sid", "abc123"))
        .unwrap();

    let err = jar.delete_cookie("example.com", "sid").unwrap_err();
    assert!(err.is_operation());
    assert_eq!(jar.dump().unwrap().len(), 1);
}

#[test]
fn test_update_replaces_value() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);
        jar.add_cookie(&NewCookie::new("example.com", "sid", "old"))
            .unwrap();

        jar.update_cookie(&NewCookie::new("example.com", "sid", "new"), false)
            .unwrap();

        let all = jar.dump().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, "new");
    }
}

#[test]
fn test_update_missing_with_ignore_missing_adds() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);

        jar.update_cookie(&NewCookie::new("example.com", "sid", "abc123"), true)
            .unwrap();

        let all = jar.dump().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].value, "abc123");
    }
}

#[test]
fn test_update_missing_strict_fails() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);

        let err = jar
            .update_cookie(&NewCookie::new("example.com", "sid", "abc123"), false)
            .unwrap_err();

        assert!(err.is_operation());
        assert!(jar.dump().unwrap().is_empty());
    }
}

#[test]
fn test_find_without_filters_fails() {
    let (_dir, path) = create_jar(Browser::Firefox);
    let jar = open(Browser::Firefox, &path);
    jar.add_cookie(&NewCookie::new("example.com", "sid", "abc123"))
        .unwrap();

    assert!(matches!(
        jar.find_cookies("", "", ""),
        Err(CookieError::InvalidQuery)
    ));
}

#[test]
fn test_dump_returns_every_row() {
    for browser in Browser::all() {
        let (_dir, path) = create_jar(browser);
        let jar = open(browser, &path);

        for i in 0..5 {
            jar.add_cookie(&NewCookie::new(format!("host{}.com", i), format!("c{}", i), "v"))
                .unwrap();
        }

        let all = jar.dump().unwrap();
        assert_eq!(all.len(), 5);
        for (i, record) in all.iter().enumerate() {
            assert_eq!(record.host, format!("host{}.com", i));
            assert_eq!(record.name, format!("c{}", i));
        }
    }
}

#[test]
fn test_locked_database_is_an_operation_error() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let jar = open(Browser::Chrome, &path);

    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN EXCLUSIVE;").unwrap();

    let err = jar
        .add_cookie(&NewCookie::new("example.com", "sid", "abc123"))
        .unwrap_err();
    assert!(err.is_operation());

    holder.execute_batch("ROLLBACK;").unwrap();
    assert!(jar.dump().unwrap().is_empty());
}

#[test]
fn test_commit_blocked_by_reader_is_a_commit_error() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let jar = open(Browser::Chrome, &path);

    // An open read transaction keeps a shared lock until it ends
    let holder = Connection::open(&path).unwrap();
    holder.execute_batch("BEGIN;").unwrap();
    let count: i64 = holder
        .query_row("SELECT count(*) FROM cookies", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);

    let err = jar
        .add_cookie(&NewCookie::new("example.com", "sid", "abc123"))
        .unwrap_err();
    assert!(matches!(err, CookieError::Commit(_)), "{:?}", err);
    assert!(err.to_string().contains("is browser open?"));

    holder.execute_batch("ROLLBACK;").unwrap();
    assert!(jar.dump().unwrap().is_empty());
}

fn run_cli(args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_cookie-eater"))
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

#[test]
fn test_cli_add_find_delete() {
    let (_dir, path) = create_jar(Browser::Firefox);
    let db = path.to_str().unwrap();

    let (success, _, stderr) = run_cli(&[
        "--browser", "firefox", "--db", db, "add", "example.com", "sid", "abc123", "--extra",
        "same_site=2",
    ]);
    assert!(success, "add failed: {}", stderr);

    let (success, stdout, stderr) = run_cli(&["--browser", "firefox", "--db", db, "find", "--host", "EXAMPLE"]);
    assert!(success, "find failed: {}", stderr);
    let records: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(records[0]["host"], "example.com");
    assert_eq!(records[0]["value"], "abc123");
    assert_eq!(records[0]["same_site"], 2);

    let (success, _, _) = run_cli(&["--browser", "firefox", "--db", db, "delete", "example.com", "sid"]);
    assert!(success);

    let (success, stdout, _) = run_cli(&["--browser", "firefox", "--db", db, "dump"]);
    assert!(success);
    assert_eq!(stdout.trim(), "[]");
}

#[test]
fn test_cli_rejects_out_of_range_expiry() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let db = path.to_str().unwrap();

    let (success, _, stderr) = run_cli(&[
        "--db",
        db,
        "add",
        "example.com",
        "sid",
        "abc123",
        "--expires-in-hours",
        "9223372036854775807",
    ]);
    assert!(!success);
    assert!(stderr.contains("out of range"), "{}", stderr);
    assert!(!stderr.contains("panicked"), "{}", stderr);

    let (success, stdout, _) = run_cli(&["--db", db, "dump"]);
    assert!(success);
    assert_eq!(stdout.trim(), "[]");
}

#[test]
fn test_cli_find_without_filters_fails() {
    let (_dir, path) = create_jar(Browser::Chrome);
    let (success, _, stderr) = run_cli(&["--db", path.to_str().unwrap(), "find"]);
    assert!(!success);
    assert!(stderr.contains("Please specify something to search by"));
}
