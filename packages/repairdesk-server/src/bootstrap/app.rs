use crate::bootstrap::config::ServerConfig;
use crate::db;
use crate::services::notify::{Notifier, Renderer};
use crate::services::settings::SettingsStore;
use crate::services::settings::crypto::SettingsCipher;
use crate::state::AppState;
use anyhow::{Context, Result};
use repairdesk_telegram::TelegramClient;
use sea_orm::Database;
use tracing::info;

/// 连接数据库、执行迁移、补齐默认设置
pub(crate) async fn prepare_settings(config: &ServerConfig) -> Result<SettingsStore> {
    let db_cnn = Database::connect(&config.db_url)
        .await
        .with_context(|| format!("failed to connect database: {}", config.db_url))?;
    db::initialize::initial(&db_cnn)
        .await
        .context("failed to run migrations")?;

    let settings = SettingsStore::new(
        db_cnn,
        SettingsCipher::from_secret(&config.settings_secret),
    );
    let seeded = settings
        .initialize_defaults()
        .await
        .context("failed to seed default settings")?;
    info!(seeded, "settings ready");

    Ok(settings)
}

pub(crate) fn app_state(config: &ServerConfig, settings: SettingsStore) -> AppState {
    let notifier = Notifier::new(
        settings.clone(),
        TelegramClient::new(&config.telegram_api).with_timeout(config.telegram_timeout),
        config.telegram.clone(),
        Renderer::new(config.utc_offset),
    );
    AppState { settings, notifier }
}
