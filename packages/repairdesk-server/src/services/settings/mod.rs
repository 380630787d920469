pub(crate) mod crypto;
mod defaults;
pub(crate) mod keys;

use crate::db::{SettingRows, settings};
use chrono::Utc;
use crypto::{CryptoError, SettingsCipher};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub(crate) enum SettingsError {
    #[error("setting not found: {0}")]
    NotFound(String),
    #[error("failed to decrypt setting {key}: {source}")]
    Decryption {
        key: String,
        #[source]
        source: CryptoError,
    },
    #[error("failed to encrypt setting {key}: {source}")]
    Encryption {
        key: String,
        #[source]
        source: CryptoError,
    },
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

/// 持久化的键值设置；敏感键写入前加密、读取时解密
#[derive(Clone)]
pub(crate) struct SettingsStore {
    db: DatabaseConnection,
    cipher: SettingsCipher,
}

impl SettingsStore {
    pub(crate) fn new(db: DatabaseConnection, cipher: SettingsCipher) -> Self {
        Self { db, cipher }
    }

    async fn find_row(&self, key: &str) -> Result<Option<settings::Model>, SettingsError> {
        Ok(SettingRows::find()
            .filter(settings::Column::Key.eq(key))
            .one(&self.db)
            .await?)
    }

    fn reveal(&self, row: settings::Model) -> Result<String, SettingsError> {
        if !keys::is_sensitive(&row.key) {
            return Ok(row.value);
        }
        self.cipher
            .decrypt(&row.value)
            .map_err(|source| SettingsError::Decryption { key: row.key, source })
    }

    pub(crate) async fn exists(&self, key: &str) -> Result<bool, SettingsError> {
        Ok(self.find_row(key).await?.is_some())
    }

    pub(crate) async fn get(&self, key: &str) -> Result<String, SettingsError> {
        let row = self
            .find_row(key)
            .await?
            .ok_or_else(|| SettingsError::NotFound(key.to_string()))?;
        self.reveal(row)
    }

    /// 任何读取失败都返回 `fallback`
    pub(crate) async fn get_with_default(&self, key: &str, fallback: &str) -> String {
        match self.get(key).await {
            Ok(value) => value,
            Err(SettingsError::NotFound(_)) => fallback.to_string(),
            Err(err) => {
                warn!(key, error = %err, "setting unreadable, using fallback");
                fallback.to_string()
            }
        }
    }

    /// 缺失或无法解析时为 `false`
    pub(crate) async fn get_bool(&self, key: &str) -> bool {
        match self.get(key).await {
            Ok(value) => parse_bool(&value).unwrap_or(false),
            Err(SettingsError::NotFound(_)) => false,
            Err(err) => {
                warn!(key, error = %err, "setting unreadable, treating as false");
                false
            }
        }
    }

    /// 按 key upsert；并发写同一个键时后写者生效
    pub(crate) async fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let stored = if keys::is_sensitive(key) {
            self.cipher
                .encrypt(value)
                .map_err(|source| SettingsError::Encryption {
                    key: key.to_string(),
                    source,
                })?
        } else {
            value.to_string()
        };

        let now = Utc::now();
        let row = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(stored),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        SettingRows::insert(row)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    pub(crate) async fn set_bool(&self, key: &str, value: bool) -> Result<(), SettingsError> {
        self.set(key, if value { "true" } else { "false" }).await
    }

    /// 全部设置的明文；任何一个敏感值解密失败则整体失败
    pub(crate) async fn get_all(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        let rows = SettingRows::find().all(&self.db).await?;
        let mut result = BTreeMap::new();
        for row in rows {
            let key = row.key.clone();
            result.insert(key, self.reveal(row)?);
        }
        Ok(result)
    }

    #[cfg(test)]
    pub(crate) async fn raw_value(&self, key: &str) -> Option<String> {
        self.find_row(key).await.unwrap().map(|row| row.value)
    }
}

/// 与 Go `strconv.ParseBool` 接受的字面量一致
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) async fn test_store() -> SettingsStore {
    SettingsStore::new(
        crate::db::test_db().await,
        SettingsCipher::from_secret("unit-test-secret"),
    )
}
