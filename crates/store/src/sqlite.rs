//! SQLite student-model backend.
//!
//! Uses a single database file with one table:
//! - `student_models` — one row per student, the whole model as a JSON
//!   document plus created/updated timestamps for inspection.
//!
//! The JSON-document shape survives model field additions without schema
//! migrations; serde defaults fill anything an old row lacks.

use async_trait::async_trait;
use oxtutor_core::error::StoreError;
use oxtutor_core::{StudentModel, StudentRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite student-model store.
pub struct SqliteStudentStore {
    pool: SqlitePool,
}

impl SqliteStudentStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and table are created automatically. Pass
    /// `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite student store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS student_models (
                student_id  TEXT PRIMARY KEY,
                data        TEXT NOT NULL,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("student_models table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for SqliteStudentStore {
    async fn load(
        &self,
        student_id: &str,
    ) -> std::result::Result<Option<StudentModel>, StoreError> {
        let row = sqlx::query("SELECT data FROM student_models WHERE student_id = ?1")
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT by id: {e}")))?;

        match row {
            Some(r) => {
                let data: String = r
                    .try_get("data")
                    .map_err(|e| StoreError::QueryFailed(format!("data column: {e}")))?;
                let model: StudentModel = serde_json::from_str(&data)
                    .map_err(|e| StoreError::QueryFailed(format!("corrupt model JSON: {e}")))?;
                Ok(Some(model))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, model: &StudentModel) -> std::result::Result<(), StoreError> {
        let data = serde_json::to_string(model)
            .map_err(|e| StoreError::Storage(format!("Model serialization: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO student_models (student_id, data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&model.student_id)
        .bind(&data)
        .bind(model.created_at.to_rfc3339())
        .bind(model.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPSERT failed: {e}")))?;

        debug!(student_id = %model.student_id, "Saved student model");
        Ok(())
    }

    async fn create_default(
        &self,
        student_id: &str,
    ) -> std::result::Result<StudentModel, StoreError> {
        let model = StudentModel::new(student_id);
        self.save(&model).await?;
        Ok(model)
    }

    async fn delete(&self, student_id: &str) -> std::result::Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM student_models WHERE student_id = ?1")
            .bind(student_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_ids(&self) -> std::result::Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT student_id FROM student_models ORDER BY student_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("SELECT ids: {e}")))?;

        rows.iter()
            .map(|r| {
                r.try_get("student_id")
                    .map_err(|e| StoreError::QueryFailed(format!("student_id column: {e}")))
            })
            .collect()
    }
}
