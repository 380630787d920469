use crate::services::notify::TelegramFallback;
use anyhow::{Context, Result};
use chrono::FixedOffset;
use repairdesk_telegram::DEFAULT_API_BASE;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::warn;

const DEFAULT_ADDR: &str = "0.0.0.0:1234";
const DEFAULT_DB_URL: &str = "sqlite://repairdesk.db?mode=rwc";
const DEVELOPMENT_SECRET: &str = "repairdesk-development-secret";
const DEFAULT_TELEGRAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub(crate) struct ServerConfig {
    pub(crate) addr: SocketAddr,
    pub(crate) db_url: String,
    /// 设置加密用的进程密钥
    pub(crate) settings_secret: String,
    pub(crate) telegram_api: String,
    /// 单次 sendMessage 请求的超时
    pub(crate) telegram_timeout: Duration,
    /// 停机时等待未完成通知的时长
    pub(crate) shutdown_grace: Duration,
    pub(crate) utc_offset: FixedOffset,
    pub(crate) telegram: TelegramFallback,
}

impl ServerConfig {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 空字符串与未设置等同
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let addr_text = var("REPAIRDESK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = parse_addr(&addr_text)?;

        let settings_secret = match var("REPAIRDESK_SETTINGS_SECRET") {
            Some(secret) => secret,
            None => {
                warn!(
                    "REPAIRDESK_SETTINGS_SECRET is not set, encrypting settings with the development secret"
                );
                DEVELOPMENT_SECRET.to_string()
            }
        };

        let utc_offset = match var("REPAIRDESK_UTC_OFFSET_HOURS") {
            Some(text) => parse_offset_hours(&text)?,
            None => FixedOffset::east_opt(0).context("zero utc offset")?,
        };

        let telegram_timeout = match var("REPAIRDESK_TELEGRAM_TIMEOUT_SECS") {
            Some(text) => parse_secs("REPAIRDESK_TELEGRAM_TIMEOUT_SECS", &text)?,
            None => Duration::from_secs(DEFAULT_TELEGRAM_TIMEOUT_SECS),
        };
        let shutdown_grace = match var("REPAIRDESK_SHUTDOWN_GRACE_SECS") {
            Some(text) => parse_secs("REPAIRDESK_SHUTDOWN_GRACE_SECS", &text)?,
            None => Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        };

        Ok(Self {
            addr,
            db_url: var("REPAIRDESK_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
            settings_secret,
            telegram_api: var("REPAIRDESK_TELEGRAM_API")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            telegram_timeout,
            shutdown_grace,
            utc_offset,
            telegram: TelegramFallback {
                bot_token: var("TELEGRAM_BOT_TOKEN"),
                chat_id: var("TELEGRAM_CHAT_ID"),
                enabled: var("TELEGRAM_ENABLED").as_deref() == Some("true"),
            },
        })
    }

    /// 命令行参数优先于环境变量
    pub(crate) fn with_overrides(mut self, addr: Option<&str>, db_url: Option<&str>) -> Result<Self> {
        if let Some(addr) = addr {
            self.addr = parse_addr(addr)?;
        }
        if let Some(db_url) = db_url {
            self.db_url = db_url.to_string();
        }
        Ok(self)
    }
}

fn parse_addr(text: &str) -> Result<SocketAddr> {
    text.parse()
        .with_context(|| format!("invalid REPAIRDESK_ADDR: {text}"))
}

fn parse_secs(key: &str, text: &str) -> Result<Duration> {
    let secs: u64 = text
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {text}"))?;
    Ok(Duration::from_secs(secs))
}

fn parse_offset_hours(text: &str) -> Result<FixedOffset> {
    let hours: i32 = text
        .trim()
        .parse()
        .with_context(|| format!("invalid REPAIRDESK_UTC_OFFSET_HOURS: {text}"))?;
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("REPAIRDESK_UTC_OFFSET_HOURS out of range: {text}"))
}
