use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use super::{AnalysisStage, Case, CaseStore};
use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Key holding the JSON-serialized case collection.
const CASES_KEY: &str = "legal_cases";
/// Key holding the API key.
const API_KEY_KEY: &str = "gemini_api_key";
/// Pre-case flat history list, converted once at open.
const LEGACY_HISTORY_KEY: &str = "legal_analysis_history";

/// SQLite-backed case store.
///
/// A single key-value table holds the API key and the whole case collection
/// as one JSON value, so `save_all_cases` is a single row write and is atomic
/// from the caller's perspective.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

/// Shape of one record under the legacy flat-history key.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyHistoryItem {
    id: String,
    stage_index: i32,
    stage: String,
    input: String,
    output: String,
    date: DateTime<Utc>,
}

impl SqliteStore {
    /// Open (or create) the store at the configured path and run migrations.
    pub async fn new(config: &DatabaseConfig) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StoreError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        store.migrate_legacy_history().await?;

        Ok(store)
    }

    /// Create an in-memory store for testing.
    pub async fn new_in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StoreError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        store.migrate_legacy_history().await?;

        Ok(store)
    }

    /// Run schema migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;
        Ok(())
    }

    /// One-time conversion of the legacy flat history list into cases.
    ///
    /// Runs at every open and is idempotent: once the cases key exists (even
    /// as an empty collection) the legacy key is ignored. Each history record
    /// becomes a single-stage case named from its input.
    pub async fn migrate_legacy_history(&self) -> StoreResult<()> {
        if self.kv_get(CASES_KEY).await?.is_some() {
            return Ok(());
        }
        let Some(raw) = self.kv_get(LEGACY_HISTORY_KEY).await? else {
            return Ok(());
        };

        let items: Vec<LegacyHistoryItem> =
            serde_json::from_str(&raw).map_err(|e| StoreError::Migration {
                message: format!("Legacy history did not parse: {}", e),
            })?;

        let cases: Vec<Case> = items
            .into_iter()
            .map(|item| Case {
                id: item.id.clone(),
                name: Case::name_from_input(&item.input),
                created_at: item.date,
                stages: vec![AnalysisStage {
                    id: item.id,
                    stage_index: item.stage_index,
                    stage_label: item.stage,
                    input: item.input,
                    output: item.output,
                    created_at: item.date,
                }],
                chats: Vec::new(),
            })
            .collect();

        info!(cases = cases.len(), "Converting legacy analysis history into cases");

        let payload = serde_json::to_string(&cases).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        self.kv_set(CASES_KEY, &payload).await?;
        self.kv_del(LEGACY_HISTORY_KEY).await?;

        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn kv_get(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    async fn kv_set(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE
            SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn kv_del(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Seed the legacy history key directly (test support).
    pub async fn seed_legacy_history(&self, raw_json: &str) -> StoreResult<()> {
        self.kv_set(LEGACY_HISTORY_KEY, raw_json).await
    }

    /// Whether the legacy history key is still present (test support).
    pub async fn has_legacy_history(&self) -> StoreResult<bool> {
        Ok(self.kv_get(LEGACY_HISTORY_KEY).await?.is_some())
    }
}

#[async_trait]
impl CaseStore for SqliteStore {
    async fn load_api_key(&self) -> StoreResult<String> {
        Ok(self.kv_get(API_KEY_KEY).await?.unwrap_or_default())
    }

    async fn save_api_key(&self, key: &str) -> StoreResult<()> {
        self.kv_set(API_KEY_KEY, key).await
    }

    async fn get_all_cases(&self) -> StoreResult<Vec<Case>> {
        let Some(raw) = self.kv_get(CASES_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(cases) => Ok(cases),
            Err(e) => {
                // A corrupted collection reads as empty; the next successful
                // write replaces it.
                warn!(error = %e, "Case collection did not parse, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save_all_cases(&self, cases: &[Case]) -> StoreResult<()> {
        let payload = serde_json::to_string(cases).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;
        self.kv_set(CASES_KEY, &payload).await
    }

    async fn clear_all_cases(&self) -> StoreResult<()> {
        self.kv_del(CASES_KEY).await
    }
}
