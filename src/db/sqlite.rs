use chrono::Utc;
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

use super::error::{SqlContext, StoreError};
use super::types::{
    ClusterResultRecord, NewClusterResult, NewPoint, PointId, ResultId, SamplePoint, UserId,
};
use super::PointStore;

/// SQLite-backed [`PointStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create a new in-memory database
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().action("create in-memory database")?;
        Self::with_connection(conn)
    }

    /// Open (or create) a database file
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path).action(format!("open database at {}", path))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<(), StoreError> {
        self.conn()?
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS cluster_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                group_name TEXT NOT NULL,
                k INTEGER NOT NULL,
                input_count INTEGER NOT NULL,
                restarts INTEGER NOT NULL,
                max_iterations INTEGER NOT NULL,
                complete INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS points (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                group_name TEXT NOT NULL,
                label TEXT NOT NULL,
                x REAL NOT NULL,
                y REAL NOT NULL,
                z REAL,
                included INTEGER NOT NULL DEFAULT 1,
                result_id INTEGER,
                FOREIGN KEY (result_id) REFERENCES cluster_results(id)
            );

            CREATE INDEX IF NOT EXISTS idx_points_active ON points(user_id, group_name, included);
            CREATE INDEX IF NOT EXISTS idx_points_result ON points(result_id);
            CREATE INDEX IF NOT EXISTS idx_results_user ON cluster_results(user_id);
            "#,
            )
            .action("initialize database schema")
    }

    /// Every point stamped with `result_id`, in insertion order
    pub fn get_points_for_result(&self, result_id: ResultId) -> Result<Vec<SamplePoint>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, group_name, label, x, y, z, included, result_id \
                 FROM points WHERE result_id = ?1 ORDER BY id",
            )
            .action("prepare statement")?;

        let points = stmt
            .query_map(params![result_id], point_from_row)
            .action("query points for result")?
            .collect::<Result<Vec<_>, _>>()
            .action("collect points")?;

        Ok(points)
    }

    /// Get statistics
    pub fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn()?;
        let count = |sql: &str, what: &str| -> Result<u32, StoreError> {
            conn.query_row(sql, [], |row| row.get(0))
                .action(format!("count {}", what))
        };

        Ok(StoreStats {
            point_count: count("SELECT COUNT(*) FROM points", "points")?,
            active_point_count: count(
                "SELECT COUNT(*) FROM points WHERE included = 1",
                "active points",
            )?,
            result_count: count("SELECT COUNT(*) FROM cluster_results", "results")?,
        })
    }
}

fn point_from_row(row: &Row<'_>) -> rusqlite::Result<SamplePoint> {
    let x: f64 = row.get(4)?;
    let y: f64 = row.get(5)?;
    let z: Option<f64> = row.get(6)?;

    let mut coords = vec![x, y];
    coords.extend(z);

    Ok(SamplePoint {
        id: row.get(0)?,
        user_id: row.get(1)?,
        group_name: row.get(2)?,
        label: row.get(3)?,
        coords,
        included: row.get(7)?,
        result_id: row.get(8)?,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<ClusterResultRecord> {
    let k: i64 = row.get(3)?;
    let input_count: i64 = row.get(4)?;
    let restarts: i64 = row.get(5)?;
    let max_iterations: i64 = row.get(6)?;

    Ok(ClusterResultRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        group_name: row.get(2)?,
        k: k as usize,
        input_count: input_count as usize,
        restarts: restarts as usize,
        max_iterations: max_iterations as usize,
        complete: row.get(7)?,
        created_at: row.get(8)?,
    })
}

impl PointStore for SqliteStore {
    fn load_active_points(
        &self,
        user_id: UserId,
        group_name: &str,
    ) -> Result<Vec<SamplePoint>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, group_name, label, x, y, z, included, result_id \
                 FROM points WHERE user_id = ?1 AND group_name = ?2 AND included = 1",
            )
            .action("prepare statement")?;

        let points = stmt
            .query_map(params![user_id, group_name], point_from_row)
            .action("query active points")?
            .collect::<Result<Vec<_>, _>>()
            .action("collect active points")?;

        Ok(points)
    }

    fn persist_point(&self, point: &NewPoint) -> Result<PointId, StoreError> {
        let (x, y, z) = match point.coords.as_slice() {
            [x, y] => (*x, *y, None),
            [x, y, z] => (*x, *y, Some(*z)),
            other => return Err(StoreError::Dimensions(other.len())),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO points (user_id, group_name, label, x, y, z, included, result_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                point.user_id,
                point.group_name,
                point.label,
                x,
                y,
                z,
                point.included,
                point.result_id
            ],
        )
        .action(format!("insert point: {}", point.label))?;

        Ok(conn.last_insert_rowid())
    }

    fn exclude_points(&self, ids: &[PointId], result_id: ResultId) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().action("begin transaction")?;
        let mut excluded = 0;
        {
            let mut stmt = tx
                .prepare(
                    "UPDATE points SET included = 0, result_id = ?1 \
                     WHERE id = ?2 AND included = 1",
                )
                .action("prepare statement")?;
            for id in ids {
                excluded += stmt
                    .execute(params![result_id, id])
                    .action(format!("exclude point {}", id))?;
            }
        }
        tx.commit().action("commit point exclusion")?;
        Ok(excluded)
    }

    fn insert_result(&self, result: &NewClusterResult) -> Result<ResultId, StoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "INSERT INTO cluster_results \
             (user_id, group_name, k, input_count, restarts, max_iterations, complete, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7) RETURNING id",
            params![
                result.user_id,
                result.group_name,
                result.k as i64,
                result.input_count as i64,
                result.restarts as i64,
                result.max_iterations as i64,
                Utc::now().to_rfc3339()
            ],
            |row| row.get(0),
        )
        .action(format!("insert cluster result for user {}", result.user_id))
    }

    fn mark_result_complete(&self, result_id: ResultId) -> Result<(), StoreError> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE cluster_results SET complete = 1 WHERE id = ?1",
                params![result_id],
            )
            .action(format!("complete cluster result {}", result_id))?;

        if updated == 0 {
            return Err(StoreError::NotFound(result_id));
        }
        Ok(())
    }

    fn latest_result_id(&self, user_id: UserId) -> Result<Option<ResultId>, StoreError> {
        self.conn()?
            .query_row(
                "SELECT MAX(id) FROM cluster_results WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .action(format!("look up latest result for user {}", user_id))
    }

    fn list_results(&self, user_id: UserId) -> Result<Vec<ClusterResultRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, group_name, k, input_count, restarts, max_iterations, \
                 complete, created_at FROM cluster_results WHERE user_id = ?1 ORDER BY id DESC",
            )
            .action("prepare statement")?;

        let results = stmt
            .query_map(params![user_id], result_from_row)
            .action("query cluster results")?
            .collect::<Result<Vec<_>, _>>()
            .action("collect cluster results")?;

        Ok(results)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub point_count: u32,
    pub active_point_count: u32,
    pub result_count: u32,
}
