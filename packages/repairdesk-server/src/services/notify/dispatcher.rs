use super::detector::detect;
use super::render::Renderer;
use crate::services::settings::{SettingsStore, keys};
use chrono::Utc;
use repairdesk_core::{NotificationEvent, NotificationKind, TicketMutation};
use repairdesk_telegram::{Destination, TelegramClient, TelegramResult};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// 数据库里没有值时使用的进程级 Telegram 配置
#[derive(Debug, Clone, Default)]
pub(crate) struct TelegramFallback {
    pub(crate) bot_token: Option<String>,
    pub(crate) chat_id: Option<String>,
    pub(crate) enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DispatchOutcome {
    Sent,
    /// 未启用或未配置目标，不算错误
    Suppressed,
}

#[derive(Clone)]
pub(crate) struct Notifier {
    settings: SettingsStore,
    client: TelegramClient,
    fallback: TelegramFallback,
    renderer: Renderer,
    /// 克隆之间共享，停机时等待后台发送
    tracker: TaskTracker,
}

impl Notifier {
    pub(crate) fn new(
        settings: SettingsStore,
        client: TelegramClient,
        fallback: TelegramFallback,
        renderer: Renderer,
    ) -> Self {
        Self {
            settings,
            client,
            fallback,
            renderer,
            tracker: TaskTracker::new(),
        }
    }

    /// 每次调用都重新读取设置，开关改动对下一条通知立即生效
    async fn resolve(&self) -> (bool, Destination) {
        let enabled =
            self.settings.get_bool(keys::TELEGRAM_ENABLED).await || self.fallback.enabled;
        let bot_token = self
            .settings
            .get_with_default(
                keys::TELEGRAM_BOT_TOKEN,
                self.fallback.bot_token.as_deref().unwrap_or_default(),
            )
            .await;
        let chat_id = self
            .settings
            .get_with_default(
                keys::TELEGRAM_CHAT_ID,
                self.fallback.chat_id.as_deref().unwrap_or_default(),
            )
            .await;
        (enabled, Destination::new(bot_token, chat_id))
    }

    /// 全局开关关闭或目标不完整时直接返回 `Suppressed`
    pub(crate) async fn send(&self, text: &str) -> TelegramResult<DispatchOutcome> {
        let (enabled, destination) = self.resolve().await;
        if !enabled || !destination.is_configured() {
            return Ok(DispatchOutcome::Suppressed);
        }
        self.client.send_message(&destination, text).await?;
        Ok(DispatchOutcome::Sent)
    }

    async fn kind_enabled(&self, kind: NotificationKind) -> bool {
        let toggle = match kind {
            NotificationKind::NewTicket => keys::TELEGRAM_NOTIFY_NEW_REQUEST,
            NotificationKind::StatusChanged => keys::TELEGRAM_NOTIFY_STATUS_CHANGE,
            NotificationKind::Assigned => keys::TELEGRAM_NOTIFY_ASSIGNMENT,
            // 完成与拒绝只受全局开关控制
            NotificationKind::Completed | NotificationKind::Rejected => return true,
        };
        self.settings.get_bool(toggle).await
    }

    pub(crate) async fn dispatch(
        &self,
        event: &NotificationEvent,
    ) -> TelegramResult<DispatchOutcome> {
        let kind = event.kind();
        if !self.kind_enabled(kind).await {
            debug!(?kind, ticket_id = event.ticket().id, "notification kind disabled");
            return Ok(DispatchOutcome::Suppressed);
        }
        let text = self.renderer.render(event, Utc::now());
        self.send(&text).await
    }

    /// 后台处理一次报修单变更：按规则顺序依次发送，失败只记录日志。
    /// 调用方不需要等待返回的句柄。
    pub(crate) fn submit(&self, mutation: TicketMutation) -> JoinHandle<()> {
        let notifier = self.clone();
        self.tracker.spawn(async move {
            let events = detect(
                mutation.before.as_ref(),
                &mutation.after,
                mutation.actor.as_ref(),
            );
            for event in &events {
                let kind = event.kind();
                let ticket_id = event.ticket().id;
                match notifier.dispatch(event).await {
                    Ok(DispatchOutcome::Sent) => info!(?kind, ticket_id, "notification sent"),
                    Ok(DispatchOutcome::Suppressed) => {
                        debug!(?kind, ticket_id, "notification suppressed")
                    }
                    Err(err) => {
                        warn!(?kind, ticket_id, error = %err, "failed to send notification")
                    }
                }
            }
        })
    }

    /// 停机时最多等待 `grace`，超时仍未完成的通知随运行时一起丢弃
    pub(crate) async fn shutdown(&self, grace: Duration) {
        self.tracker.close();
        if self.tracker.is_empty() {
            return;
        }
        info!(pending = self.tracker.len(), "waiting for pending notifications");
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_err() {
            warn!(
                pending = self.tracker.len(),
                "pending notifications dropped at shutdown"
            );
        }
    }

    /// 测试消息直接发往给定目标，不看启用开关
    pub(crate) async fn send_test(
        &self,
        destination: &Destination,
        site_name: &str,
    ) -> TelegramResult<()> {
        let text = self.renderer.test_message(site_name, Utc::now());
        self.client.send_message(destination, &text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::settings::test_store;
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;
    use repairdesk_core::{TicketPriority, TicketSnapshot, TicketStatus, UserRef};

    const TOKEN: &str = "123:abc";

    fn snapshot(status: TicketStatus, technician: Option<UserRef>) -> TicketSnapshot {
        TicketSnapshot {
            id: 7,
            title: "Broken door lock".to_string(),
            description: "Front door lock is jammed".to_string(),
            location: "Lobby".to_string(),
            priority: TicketPriority::High,
            status,
            requester: None,
            technician,
            rejection_reason: String::new(),
            completed_at: None,
            cost: 0.0,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap(),
        }
    }

    fn technician() -> UserRef {
        UserRef {
            id: 4,
            username: "tech4".to_string(),
            full_name: "Tech Four".to_string(),
        }
    }

    async fn notifier(base_url: &str, fallback: TelegramFallback) -> Notifier {
        let store = test_store().await;
        store.initialize_defaults().await.unwrap();
        Notifier::new(
            store,
            TelegramClient::new(base_url),
            fallback,
            Renderer::default(),
        )
    }

    async fn configure(notifier: &Notifier) {
        notifier
            .settings
            .set_bool(keys::TELEGRAM_ENABLED, true)
            .await
            .unwrap();
        notifier
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, TOKEN)
            .await
            .unwrap();
        notifier
            .settings
            .set(keys::TELEGRAM_CHAT_ID, "-100")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_send_is_noop() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;
        notifier
            .settings
            .set_bool(keys::TELEGRAM_ENABLED, false)
            .await
            .unwrap();

        let outcome = notifier.send("hello").await.unwrap();

        assert_eq!(outcome, DispatchOutcome::Suppressed);
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_missing_chat_id_is_noop() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        notifier
            .settings
            .set_bool(keys::TELEGRAM_ENABLED, true)
            .await
            .unwrap();
        notifier
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, TOKEN)
            .await
            .unwrap();

        assert_eq!(
            notifier.send("hello").await.unwrap(),
            DispatchOutcome::Suppressed
        );
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_send_uses_stored_destination() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:abc/sendMessage")
                    .body_includes("\"chat_id\":\"-100\"");
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        assert_eq!(notifier.send("hello").await.unwrap(), DispatchOutcome::Sent);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_env_fallback_destination() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botenv-token/sendMessage")
                    .body_includes("\"chat_id\":\"-555\"");
                then.status(200);
            })
            .await;

        let fallback = TelegramFallback {
            bot_token: Some("env-token".to_string()),
            chat_id: Some("-555".to_string()),
            enabled: true,
        };
        let notifier = notifier(&server.base_url(), fallback).await;

        assert_eq!(notifier.send("hello").await.unwrap(), DispatchOutcome::Sent);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_surfaced() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(502);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        assert!(notifier.send("hello").await.is_err());
        mock.assert_calls_async(1).await;
    }

    #[tokio::test]
    async fn test_kind_toggle_suppresses() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;
        notifier
            .settings
            .set_bool(keys::TELEGRAM_NOTIFY_NEW_REQUEST, false)
            .await
            .unwrap();

        let event = NotificationEvent::NewTicket {
            ticket: snapshot(TicketStatus::Pending, None),
        };
        assert_eq!(
            notifier.dispatch(&event).await.unwrap(),
            DispatchOutcome::Suppressed
        );
        mock.assert_calls_async(0).await;
    }

    #[tokio::test]
    async fn test_completion_ignores_kind_toggle() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).body_includes("#เสร็จสิ้น");
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;
        notifier
            .settings
            .set_bool(keys::TELEGRAM_NOTIFY_COMPLETION, false)
            .await
            .unwrap();

        let event = NotificationEvent::Completed {
            technician: Some(technician()),
            ticket: snapshot(TicketStatus::Completed, Some(technician())),
        };
        assert_eq!(
            notifier.dispatch(&event).await.unwrap(),
            DispatchOutcome::Sent
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_sends_each_event() {
        let server = MockServer::start_async().await;
        let status_mock = server
            .mock_async(|when, then| {
                when.method(POST).body_includes("#เปลี่ยนสถานะ");
                then.status(200);
            })
            .await;
        let assign_mock = server
            .mock_async(|when, then| {
                when.method(POST).body_includes("#มอบหมายงาน");
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        let mutation = TicketMutation {
            before: Some(snapshot(TicketStatus::Pending, None)),
            after: snapshot(TicketStatus::InProgress, Some(technician())),
            actor: None,
        };
        notifier.submit(mutation).await.unwrap();

        status_mock.assert_async().await;
        assign_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_survives_transport_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(500);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        let mutation = TicketMutation {
            before: Some(snapshot(TicketStatus::InProgress, Some(technician()))),
            after: snapshot(TicketStatus::Completed, Some(technician())),
            actor: None,
        };
        notifier.submit(mutation).await.unwrap();

        // 状态变化与完成各发送一次
        mock.assert_calls_async(2).await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_submitted_mutation() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).body_includes("Broken door lock");
                then.status(200).delay(Duration::from_millis(200));
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        let mutation = TicketMutation {
            before: None,
            after: snapshot(TicketStatus::Pending, None),
            actor: None,
        };
        drop(notifier.submit(mutation));
        notifier.shutdown(Duration::from_secs(5)).await;

        assert!(notifier.tracker.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_shutdown_gives_up_after_grace() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).delay(Duration::from_secs(5));
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;
        configure(&notifier).await;

        let mutation = TicketMutation {
            before: None,
            after: snapshot(TicketStatus::Pending, None),
            actor: None,
        };
        drop(notifier.submit(mutation));
        notifier.shutdown(Duration::from_millis(50)).await;

        assert_eq!(notifier.tracker.len(), 1);
    }

    #[tokio::test]
    async fn test_send_test_ignores_enabled_flag() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/botexplicit/sendMessage")
                    .body_includes("Workshop");
                then.status(200);
            })
            .await;

        let notifier = notifier(&server.base_url(), TelegramFallback::default()).await;

        notifier
            .send_test(&Destination::new("explicit", "-1"), "Workshop")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
