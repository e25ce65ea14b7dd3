//! Persistence for configured provider instances, keyed by (type, id).

use crate::arguments::ProviderArguments;
use crate::error::{LibraryError, Result};
use crate::provider::{ProviderKey, ProviderType};
use async_trait::async_trait;
use bridge_traits::Clock;
use sqlx::{query, query_as, SqlitePool};
use std::sync::Arc;

/// A stored provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub key: ProviderKey,
    pub name: String,
    pub arguments: ProviderArguments,
}

#[async_trait]
pub trait ProviderConfigRepository: Send + Sync {
    /// Store a new configuration under the next free id for its type.
    async fn insert(
        &self,
        provider_type: ProviderType,
        name: &str,
        arguments: &ProviderArguments,
    ) -> Result<ProviderConfig>;

    async fn find(&self, key: ProviderKey) -> Result<Option<ProviderConfig>>;

    /// All configurations ordered by type then id.
    async fn list(&self) -> Result<Vec<ProviderConfig>>;

    /// Replace name and arguments.
    ///
    /// # Errors
    /// `NotFound` when no configuration has this key.
    async fn update(&self, config: &ProviderConfig) -> Result<()>;

    /// Returns `false` when nothing was stored under `key`.
    async fn delete(&self, key: ProviderKey) -> Result<bool>;
}

pub struct SqliteProviderConfigRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteProviderConfigRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

type ConfigRow = (String, i64, String, String);

fn from_row((provider_type, id, name, arguments): ConfigRow) -> Result<ProviderConfig> {
    Ok(ProviderConfig {
        key: ProviderKey::new(provider_type.parse()?, id),
        name,
        arguments: ProviderArguments::from_json(&arguments)?,
    })
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LibraryError::invalid_input(
            "name",
            "provider name must not be empty",
        ));
    }
    Ok(())
}

#[async_trait]
impl ProviderConfigRepository for SqliteProviderConfigRepository {
    async fn insert(
        &self,
        provider_type: ProviderType,
        name: &str,
        arguments: &ProviderArguments,
    ) -> Result<ProviderConfig> {
        validate_name(name)?;
        let now = self.clock.unix_timestamp_millis();
        let json = arguments.to_json()?;

        let mut tx = self.pool.begin().await?;
        let (next_id,): (i64,) = query_as(
            "SELECT COALESCE(MAX(id), 0) + 1 FROM provider_configs WHERE provider_type = ?",
        )
        .bind(provider_type.as_str())
        .fetch_one(&mut *tx)
        .await?;

        query(
            r#"
            INSERT INTO provider_configs (provider_type, id, name, arguments, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(provider_type.as_str())
        .bind(next_id)
        .bind(name)
        .bind(&json)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Ok(ProviderConfig {
            key: ProviderKey::new(provider_type, next_id),
            name: name.to_string(),
            arguments: arguments.clone(),
        })
    }

    async fn find(&self, key: ProviderKey) -> Result<Option<ProviderConfig>> {
        let row: Option<ConfigRow> = query_as(
            "SELECT provider_type, id, name, arguments FROM provider_configs WHERE provider_type = ? AND id = ?",
        )
        .bind(key.provider_type.as_str())
        .bind(key.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ProviderConfig>> {
        let rows: Vec<ConfigRow> = query_as(
            "SELECT provider_type, id, name, arguments FROM provider_configs ORDER BY provider_type, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(from_row).collect()
    }

    async fn update(&self, config: &ProviderConfig) -> Result<()> {
        validate_name(&config.name)?;
        let result = query(
            "UPDATE provider_configs SET name = ?, arguments = ?, updated_at = ? WHERE provider_type = ? AND id = ?",
        )
        .bind(&config.name)
        .bind(config.arguments.to_json()?)
        .bind(self.clock.unix_timestamp_millis())
        .bind(config.key.provider_type.as_str())
        .bind(config.key.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LibraryError::not_found("ProviderConfig", config.key));
        }
        Ok(())
    }

    async fn delete(&self, key: ProviderKey) -> Result<bool> {
        let result = query("DELETE FROM provider_configs WHERE provider_type = ? AND id = ?")
            .bind(key.provider_type.as_str())
            .bind(key.id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
