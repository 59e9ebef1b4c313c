use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, Connection};

use crate::domain::entities::query::compile_pattern;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign key enforcement")?;
    register_regexp(&conn).context("failed to register regexp function")?;
    register_case_folding(&conn).context("failed to register case folding")?;
    Ok(conn)
}

/// Name of the collation that compares text by its Unicode lowercase form.
pub const UNICASE: &str = "UNICASE";

/// `UNICASE` collation and `casefold(value)`: Unicode-aware versions of
/// `NOCASE` and `lower()`, which only fold ASCII letters.
fn register_case_folding(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_collation(UNICASE, |left: &str, right: &str| {
        left.to_lowercase().cmp(&right.to_lowercase())
    })?;
    conn.create_scalar_function(
        "casefold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            Ok(match ctx.get_raw(0) {
                ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).to_lowercase()),
                other => Value::from(other),
            })
        },
    )
}

/// `regexp(pattern, value)`: case-insensitive match, NULL never matches.
/// The compiled pattern is cached per statement.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |pattern| -> Result<Regex, BoxError> {
                Ok(compile_pattern(pattern.as_str()?)?)
            })?;
            let is_match = match ctx.get_raw(1) {
                ValueRef::Null => false,
                ValueRef::Integer(number) => regex.is_match(&number.to_string()),
                ValueRef::Real(number) => regex.is_match(&number.to_string()),
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                    regex.is_match(&String::from_utf8_lossy(bytes))
                }
            };
            Ok(is_match)
        },
    )
}

pub fn ensure_parent_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
        }
    }
    Ok(())
}

/// Creates and fills the `authors` / `books` tables behind the built-in demo
/// grid. Existing rows are left alone.
pub fn seed_demo(db_path: &Path) -> Result<()> {
    ensure_parent_dir(db_path)?;
    let mut conn = open_connection(db_path)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS authors (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            Name     TEXT NOT NULL,
            Country  TEXT
        );

        CREATE TABLE IF NOT EXISTS books (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            Title      TEXT NOT NULL,
            Status     TEXT NOT NULL,
            Year       INTEGER,
            Price      REAL,
            author_id  INTEGER,
            FOREIGN KEY (author_id) REFERENCES authors(id)
        );

        CREATE INDEX IF NOT EXISTS idx_books_author ON books(author_id);
        ",
    )
    .context("failed to initialize demo schema")?;

    let existing: i64 = conn
        .query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
        .context("failed to count demo books")?;
    if existing > 0 {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to start demo seed transaction")?;
    let authors = [
        ("Ursula K. Le Guin", "United States"),
        ("Frank Herbert", "United States"),
        ("Stanisław Lem", "Poland"),
        ("Octavia E. Butler", "United States"),
    ];
    for (name, country) in authors {
        tx.execute(
            "INSERT INTO authors(Name, Country) VALUES (?1, ?2)",
            params![name, country],
        )
        .context("failed to insert demo author")?;
    }

    let books: [(&str, &str, i64, f64, i64); 8] = [
        ("The Left Hand of Darkness", "ACTIVE", 1969, 12.5, 1),
        ("The Dispossessed", "ACTIVE", 1974, 11.0, 1),
        ("Dune", "ACTIVE", 1965, 15.0, 2),
        ("Dune Messiah", "INACTIVE", 1969, 9.5, 2),
        ("Solaris", "ACTIVE", 1961, 10.0, 3),
        ("The Cyberiad", "ARCHIVED", 1965, 8.0, 3),
        ("Kindred", "ACTIVE", 1979, 13.0, 4),
        ("Parable of the Sower", "INACTIVE", 1993, 14.0, 4),
    ];
    let mut insert_book = tx
        .prepare(
            "INSERT INTO books(Title, Status, Year, Price, author_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .context("failed to prepare demo book insert")?;
    for (title, status, year, price, author_id) in books {
        insert_book
            .execute(params![title, status, year, price, author_id])
            .context("failed to insert demo book")?;
    }
    drop(insert_book);

    tx.commit().context("failed to commit demo seed")?;
    Ok(())
}
