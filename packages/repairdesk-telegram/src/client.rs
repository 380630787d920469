use crate::error::*;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// 消息投递目标：机器人 token 与会话 id
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub bot_token: String,
    pub chat_id: String,
}

impl Destination {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// token 和 chat id 都存在时才可以发送
    pub fn is_configured(&self) -> bool {
        !self.bot_token.is_empty() && !self.chat_id.is_empty()
    }
}

// token 不进日志
impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bot_token = if self.bot_token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Destination")
            .field("bot_token", &bot_token)
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

/// `sendMessage` 请求体
#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    description: Option<String>,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TelegramClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

impl TelegramClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn send_message_url(&self, bot_token: &str) -> TelegramResult<Url> {
        Ok(Url::parse(&format!(
            "{}/bot{}/sendMessage",
            self.base_url, bot_token
        ))?)
    }

    /// 以 HTML 模式发送一条消息，只有 HTTP 200 视为成功，失败不重试
    pub async fn send_message(&self, destination: &Destination, text: &str) -> TelegramResult<()> {
        let url = self.send_message_url(&destination.bot_token)?;
        let body = SendMessage {
            chat_id: &destination.chat_id,
            text,
            parse_mode: Some("HTML"),
        };

        // 错误信息里的 URL 含有 token，丢弃
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let description = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.description);
            return Err(TelegramError::Status {
                status: status.as_u16(),
                description,
            });
        }

        Ok(())
    }
}
