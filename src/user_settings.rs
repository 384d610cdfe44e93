use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::settings::{BoardSettings, BoardSettingsPatch, merge_fields};

/// Board settings row of one user, as stored by the settings service.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSettings {
    pub user_id: String,
    pub settings: BoardSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct UserSettingsRow {
    user_id: String,
    settings: String,
    created_at: String,
    updated_at: String,
}

impl UserSettingsRow {
    fn fields(&self) -> Result<Map<String, Value>> {
        match serde_json::from_str(&self.settings)
            .with_context(|| format!("Stored settings for '{}' are not JSON", self.user_id))?
        {
            Value::Object(fields) => Ok(fields),
            _ => anyhow::bail!("Stored settings for '{}' are not an object", self.user_id),
        }
    }

    fn into_record(self) -> Result<UserSettings> {
        let settings = serde_json::from_value(Value::Object(self.fields()?))
            .with_context(|| format!("Stored settings for '{}' are malformed", self.user_id))?;
        let created_at = self
            .created_at
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("Stored created_at for '{}' is invalid", self.user_id))?;
        let updated_at = self
            .updated_at
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("Stored updated_at for '{}' is invalid", self.user_id))?;
        Ok(UserSettings {
            settings,
            created_at,
            updated_at,
            user_id: self.user_id,
        })
    }
}

impl UserSettings {
    pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<Option<Self>> {
        let row: Option<UserSettingsRow> = sqlx::query_as(
            "SELECT user_id, settings, created_at, updated_at FROM board_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get board settings")?;

        row.map(UserSettingsRow::into_record).transpose()
    }

    /// Stores the full record, replacing whatever the user had.
    pub async fn upsert(pool: &SqlitePool, user_id: &str, settings: &BoardSettings) -> Result<Self> {
        let raw = serde_json::to_string(settings).context("Failed to encode board settings")?;
        write_raw(pool, user_id, &raw).await?;
        Self::get(pool, user_id)
            .await?
            .context("Board settings vanished after write")
    }

    /// Merges the provided fields over the stored record, or over the defaults
    /// for a user without one.
    pub async fn patch(
        pool: &SqlitePool,
        user_id: &str,
        patch: &BoardSettingsPatch,
    ) -> Result<Self> {
        let mut tx = pool.begin().await.context("Failed to start transaction")?;

        let existing: Option<UserSettingsRow> = sqlx::query_as(
            "SELECT user_id, settings, created_at, updated_at FROM board_settings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to get board settings")?;

        let mut fields = match existing {
            Some(row) => row.fields()?,
            None => match serde_json::to_value(BoardSettings::default())? {
                Value::Object(fields) => fields,
                _ => Map::new(),
            },
        };
        merge_fields(&mut fields, patch);
        let raw = serde_json::to_string(&Value::Object(fields))
            .context("Failed to encode board settings")?;

        let now = Utc::now().to_rfc3339();
        sqlx::query(UPSERT_SQL)
            .bind(user_id)
            .bind(&raw)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .context("Failed to update board settings")?;

        tx.commit().await.context("Failed to commit board settings")?;

        Self::get(pool, user_id)
            .await?
            .context("Board settings vanished after write")
    }

    pub async fn delete(pool: &SqlitePool, user_id: &str) -> Result<bool> {
        let affected = sqlx::query("DELETE FROM board_settings WHERE user_id = ?")
            .bind(user_id)
            .execute(pool)
            .await
            .context("Failed to delete board settings")?
            .rows_affected();
        Ok(affected > 0)
    }
}

const UPSERT_SQL: &str = "INSERT INTO board_settings (user_id, settings, created_at, updated_at)
     VALUES (?, ?, ?, ?)
     ON CONFLICT(user_id) DO UPDATE SET settings = excluded.settings, updated_at = excluded.updated_at";

async fn write_raw(pool: &SqlitePool, user_id: &str, raw: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(UPSERT_SQL)
        .bind(user_id)
        .bind(raw)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .context("Failed to store board settings")?;
    Ok(())
}
