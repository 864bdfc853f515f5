//! SQLite price history adapter.

use crate::domain::error::MomtraderError;
use crate::domain::price::{PricePoint, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PriceHistoryPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::HashMap;
use tracing::warn;

pub struct SqlitePriceAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqlitePriceAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, MomtraderError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| MomtraderError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = u32::try_from(config.get_int("sqlite", "pool_size", 4))
            .ok()
            .filter(|size| *size >= 1)
            .ok_or_else(|| {
                MomtraderError::invalid(
                    "sqlite",
                    "pool_size",
                    format!("pool_size must be between 1 and {}", u32::MAX),
                )
            })?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool =
            Pool::builder()
                .max_size(pool_size)
                .build(manager)
                .map_err(|e: r2d2::Error| MomtraderError::Database {
                    reason: e.to_string(),
                })?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, MomtraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| MomtraderError::Database {
                reason: e.to_string(),
            })?;

        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, MomtraderError> {
        self.pool
            .get()
            .map_err(|e: r2d2::Error| MomtraderError::Database {
                reason: e.to_string(),
            })
    }

    pub fn initialize_schema(&self) -> Result<(), MomtraderError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS price_history (
                code TEXT NOT NULL,
                date TEXT NOT NULL,
                adj_close REAL NOT NULL,
                PRIMARY KEY (code, date)
            );
            CREATE INDEX IF NOT EXISTS idx_price_history_date ON price_history(date);",
        )
        .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
            reason: e.to_string(),
        })?;

        Ok(())
    }

    pub fn insert_points(&self, code: &str, points: &[PricePoint]) -> Result<(), MomtraderError> {
        let mut conn = self.conn()?;

        let tx =
            conn.transaction()
                .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        for point in points {
            tx.execute(
                "INSERT OR REPLACE INTO price_history (code, date, adj_close)
                 VALUES (?1, ?2, ?3)",
                params![code, point.date.format("%Y-%m-%d").to_string(), point.close],
            )
            .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;
        }

        tx.commit()
            .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        Ok(())
    }

    fn fetch_points(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, MomtraderError> {
        let conn = self.conn()?;

        let start_str = start_date.format("%Y-%m-%d").to_string();
        let end_str = end_date.format("%Y-%m-%d").to_string();

        let query = "SELECT date, adj_close
                     FROM price_history
                     WHERE code = ?1 AND date >= ?2 AND date <= ?3
                     ORDER BY date ASC";

        let mut stmt =
            conn.prepare(query)
                .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?;

        let rows = stmt
            .query_map(params![code, start_str, end_str], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(PricePoint::new(date, row.get(1)?))
            })
            .map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                reason: e.to_string(),
            })?;

        let mut points = Vec::new();
        for row in rows {
            points.push(
                row.map_err(|e: rusqlite::Error| MomtraderError::DatabaseQuery {
                    reason: e.to_string(),
                })?,
            );
        }

        Ok(points)
    }
}

impl PriceHistoryPort for SqlitePriceAdapter {
    fn fetch_history(
        &self,
        codes: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HashMap<String, PriceSeries>, MomtraderError> {
        let mut history = HashMap::with_capacity(codes.len());

        for code in codes {
            let points = self
                .fetch_points(code, start_date, end_date)
                .map_err(|e| MomtraderError::collaborator("price history", e.to_string()))?;
            if points.is_empty() {
                warn!(code = %code, "no stored price data in window");
                continue;
            }
            match PriceSeries::new(code.as_str(), points) {
                Ok(series) => {
                    history.insert(code.clone(), series);
                }
                Err(e) => warn!(code = %code, error = %e, "skipping invalid stored series"),
            }
        }

        Ok(history)
    }

    fn is_available(&self) -> bool {
        self.pool.get().is_ok()
    }
}
