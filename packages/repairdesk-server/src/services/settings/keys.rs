//! Known setting keys and their per-key metadata.

pub(crate) const TELEGRAM_ENABLED: &str = "telegram_enabled";
pub(crate) const TELEGRAM_BOT_TOKEN: &str = "telegram_bot_token";
pub(crate) const TELEGRAM_CHAT_ID: &str = "telegram_chat_id";
pub(crate) const TELEGRAM_NOTIFY_NEW_REQUEST: &str = "telegram_notify_new_request";
pub(crate) const TELEGRAM_NOTIFY_STATUS_CHANGE: &str = "telegram_notify_status_change";
pub(crate) const TELEGRAM_NOTIFY_ASSIGNMENT: &str = "telegram_notify_assignment";
pub(crate) const TELEGRAM_NOTIFY_COMPLETION: &str = "telegram_notify_completion";

pub(crate) const SITE_NAME: &str = "site_name";
pub(crate) const SITE_DESCRIPTION: &str = "site_description";
pub(crate) const ADMIN_EMAIL: &str = "admin_email";
pub(crate) const AUTO_ASSIGN_TECHNICIANS: &str = "auto_assign_technicians";
pub(crate) const REQUIRE_APPROVAL: &str = "require_approval";
pub(crate) const DEFAULT_PRIORITY: &str = "default_priority";
pub(crate) const MAINTENANCE_MODE: &str = "maintenance_mode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SettingSpec {
    pub(crate) key: &'static str,
    /// 加密后再落库
    pub(crate) encrypted: bool,
    /// 首次启动时写入的默认值；`None` 表示不预置
    pub(crate) default: Option<&'static str>,
}

const fn plain(key: &'static str, default: Option<&'static str>) -> SettingSpec {
    SettingSpec {
        key,
        encrypted: false,
        default,
    }
}

pub(crate) const SETTING_SPECS: &[SettingSpec] = &[
    plain(TELEGRAM_ENABLED, Some("false")),
    SettingSpec {
        key: TELEGRAM_BOT_TOKEN,
        encrypted: true,
        default: None,
    },
    plain(TELEGRAM_CHAT_ID, None),
    plain(TELEGRAM_NOTIFY_NEW_REQUEST, Some("true")),
    plain(TELEGRAM_NOTIFY_STATUS_CHANGE, Some("true")),
    plain(TELEGRAM_NOTIFY_ASSIGNMENT, Some("true")),
    plain(TELEGRAM_NOTIFY_COMPLETION, Some("true")),
    plain(SITE_NAME, Some("Repair System")),
    plain(SITE_DESCRIPTION, Some("ระบบแจ้งซ่อมออนไลน์")),
    plain(ADMIN_EMAIL, Some("admin@example.com")),
    plain(AUTO_ASSIGN_TECHNICIANS, Some("false")),
    plain(REQUIRE_APPROVAL, Some("true")),
    plain(DEFAULT_PRIORITY, Some("medium")),
    plain(MAINTENANCE_MODE, Some("false")),
];

pub(crate) fn spec_for(key: &str) -> Option<&'static SettingSpec> {
    SETTING_SPECS.iter().find(|spec| spec.key == key)
}

/// 未登记的键按明文处理
pub(crate) fn is_sensitive(key: &str) -> bool {
    spec_for(key).is_some_and(|spec| spec.encrypted)
}

pub(crate) fn default_of(key: &str) -> &'static str {
    spec_for(key).and_then(|spec| spec.default).unwrap_or("")
}
