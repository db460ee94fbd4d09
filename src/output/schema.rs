//! Database schema for the SQLite sink

/// SQL schema for the output database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    stop_reason TEXT,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    saved INTEGER NOT NULL DEFAULT 0
);

-- One row per canonical product URL; later runs refresh the row
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL UNIQUE,
    title TEXT,
    brand TEXT,
    price TEXT,
    original_price TEXT,
    image_url TEXT,
    rating REAL,
    review_count INTEGER,
    description TEXT,
    specifications TEXT,
    sku TEXT,
    product_type TEXT,
    batch_no INTEGER NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_products_run ON products(run_id);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
