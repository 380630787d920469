use crate::services::notify::Notifier;
use crate::services::settings::SettingsStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) settings: SettingsStore,
    pub(crate) notifier: Notifier,
}

/// 内存数据库 + 指向 `telegram_api` 的通知器
#[cfg(test)]
pub(crate) async fn test_state(telegram_api: &str) -> AppState {
    use crate::services::notify::{Renderer, TelegramFallback};
    use repairdesk_telegram::TelegramClient;

    let settings = crate::services::settings::test_store().await;
    let notifier = Notifier::new(
        settings.clone(),
        TelegramClient::new(telegram_api),
        TelegramFallback::default(),
        Renderer::default(),
    );
    AppState { settings, notifier }
}
