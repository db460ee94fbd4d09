//! SQLite sink implementation
//!
//! Records every run in `runs` and upserts products keyed by URL, one
//! transaction per batch.

use crate::output::schema::initialize_schema;
use crate::output::stats::HarvestSummary;
use crate::output::traits::{BatchSink, OutputResult};
use crate::product::ProductRecord;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

const UPSERT_PRODUCT_SQL: &str = "
    INSERT INTO products (
        run_id, url, title, brand, price, original_price, image_url, rating,
        review_count, description, specifications, sku, product_type, batch_no, scraped_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
    ON CONFLICT(url) DO UPDATE SET
        run_id = excluded.run_id,
        title = excluded.title,
        brand = excluded.brand,
        price = excluded.price,
        original_price = excluded.original_price,
        image_url = excluded.image_url,
        rating = excluded.rating,
        review_count = excluded.review_count,
        description = excluded.description,
        specifications = excluded.specifications,
        sku = excluded.sku,
        product_type = excluded.product_type,
        batch_no = excluded.batch_no,
        scraped_at = excluded.scraped_at
";

/// SQLite-backed sink
pub struct SqliteSink {
    conn: Connection,
    run_id: i64,
    batches: u32,
}

impl SqliteSink {
    /// Opens (or creates) the database at `path` and starts a run record
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `config_hash` - Hash of the configuration this run uses
    pub fn open(path: &Path, config_hash: &str) -> OutputResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        Self::with_connection(conn, config_hash)
    }

    /// Creates an in-memory database
    pub fn open_in_memory(config_hash: &str) -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::with_connection(conn, config_hash)
    }

    fn with_connection(conn: Connection, config_hash: &str) -> OutputResult<Self> {
        initialize_schema(&conn)?;

        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![Utc::now().to_rfc3339(), config_hash, "running"],
        )?;
        let run_id = conn.last_insert_rowid();
        tracing::debug!("Started run {} in SQLite output", run_id);

        Ok(Self {
            conn,
            run_id,
            batches: 0,
        })
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }

    /// Read access for callers that want to query what was written
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BatchSink for SqliteSink {
    fn push_batch(&mut self, batch: &[ProductRecord]) -> OutputResult<()> {
        self.batches += 1;
        let scraped_at = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT_PRODUCT_SQL)?;
            for record in batch {
                stmt.execute(params![
                    self.run_id,
                    record.url,
                    record.title,
                    record.brand,
                    record.price,
                    record.original_price,
                    record.image_url,
                    record.rating,
                    record.review_count,
                    record.description,
                    record.specifications,
                    record.sku,
                    record.product_type,
                    self.batches,
                    scraped_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn finalize(&mut self, summary: &HarvestSummary) -> OutputResult<()> {
        self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, stop_reason = ?3,
                 pages_fetched = ?4, saved = ?5
             WHERE id = ?6",
            params![
                Utc::now().to_rfc3339(),
                summary.final_phase.to_db_string(),
                summary.stop_reason.map(|r| r.to_string()),
                summary.pages_fetched,
                summary.saved as i64,
                self.run_id,
            ],
        )?;
        Ok(())
    }
}
