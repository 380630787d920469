use crate::error::AppError;
use crate::services::settings::{SettingsStore, keys};
use crate::state::AppState;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use repairdesk_core::{
    MASKED_SECRET, Settings, SystemSettings, TelegramSettings, TestNotificationRequest,
    is_masked_or_empty,
};
use repairdesk_telegram::Destination;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .route("/test-telegram", post(test_telegram))
        // 兼容旧前端
        .route("/test-notification", post(test_telegram))
}

async fn text_or_default(store: &SettingsStore, key: &str) -> String {
    store.get_with_default(key, keys::default_of(key)).await
}

async fn get_settings(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = &state.settings;
    if let Err(err) = store.initialize_defaults().await {
        warn!(error = %err, "failed to seed default settings");
    }

    // token 永远不回传明文
    let settings = Settings {
        telegram: TelegramSettings {
            enabled: store.get_bool(keys::TELEGRAM_ENABLED).await,
            bot_token: MASKED_SECRET.to_string(),
            chat_id: store.get_with_default(keys::TELEGRAM_CHAT_ID, "").await,
            notify_on_new_request: store.get_bool(keys::TELEGRAM_NOTIFY_NEW_REQUEST).await,
            notify_on_status_change: store.get_bool(keys::TELEGRAM_NOTIFY_STATUS_CHANGE).await,
            notify_on_assignment: store.get_bool(keys::TELEGRAM_NOTIFY_ASSIGNMENT).await,
            notify_on_completion: store.get_bool(keys::TELEGRAM_NOTIFY_COMPLETION).await,
        },
        system: SystemSettings {
            site_name: text_or_default(store, keys::SITE_NAME).await,
            site_description: text_or_default(store, keys::SITE_DESCRIPTION).await,
            admin_email: text_or_default(store, keys::ADMIN_EMAIL).await,
            auto_assign_technicians: store.get_bool(keys::AUTO_ASSIGN_TECHNICIANS).await,
            require_approval: store.get_bool(keys::REQUIRE_APPROVAL).await,
            default_priority: text_or_default(store, keys::DEFAULT_PRIORITY).await,
            maintenance_mode: store.get_bool(keys::MAINTENANCE_MODE).await,
        },
    };

    Json(settings)
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Settings>,
) -> Result<impl IntoResponse, AppError> {
    let store = &state.settings;
    let telegram = &payload.telegram;
    let system = &payload.system;

    store
        .set_bool(keys::TELEGRAM_ENABLED, telegram.enabled)
        .await
        .map_err(AppError::settings("Failed to update telegram enabled setting"))?;

    // 空值或占位符表示保留原 token
    if !is_masked_or_empty(&telegram.bot_token) {
        store
            .set(keys::TELEGRAM_BOT_TOKEN, &telegram.bot_token)
            .await
            .map_err(AppError::settings("Failed to update telegram bot token"))?;
    }

    store
        .set(keys::TELEGRAM_CHAT_ID, &telegram.chat_id)
        .await
        .map_err(AppError::settings("Failed to update telegram chat ID"))?;

    for (key, value) in [
        (keys::TELEGRAM_NOTIFY_NEW_REQUEST, telegram.notify_on_new_request),
        (keys::TELEGRAM_NOTIFY_STATUS_CHANGE, telegram.notify_on_status_change),
        (keys::TELEGRAM_NOTIFY_ASSIGNMENT, telegram.notify_on_assignment),
        (keys::TELEGRAM_NOTIFY_COMPLETION, telegram.notify_on_completion),
    ] {
        store
            .set_bool(key, value)
            .await
            .map_err(AppError::settings("Failed to update notification settings"))?;
    }

    store
        .set(keys::SITE_NAME, &system.site_name)
        .await
        .map_err(AppError::settings("Failed to update site name"))?;
    store
        .set(keys::SITE_DESCRIPTION, &system.site_description)
        .await
        .map_err(AppError::settings("Failed to update site description"))?;
    store
        .set(keys::ADMIN_EMAIL, &system.admin_email)
        .await
        .map_err(AppError::settings("Failed to update admin email"))?;
    store
        .set_bool(keys::AUTO_ASSIGN_TECHNICIANS, system.auto_assign_technicians)
        .await
        .map_err(AppError::settings("Failed to update auto assign setting"))?;
    store
        .set_bool(keys::REQUIRE_APPROVAL, system.require_approval)
        .await
        .map_err(AppError::settings("Failed to update require approval setting"))?;
    store
        .set(keys::DEFAULT_PRIORITY, &system.default_priority)
        .await
        .map_err(AppError::settings("Failed to update default priority"))?;
    store
        .set_bool(keys::MAINTENANCE_MODE, system.maintenance_mode)
        .await
        .map_err(AppError::settings("Failed to update maintenance mode"))?;

    info!("settings updated");
    Ok(Json(
        serde_json::json!({ "message": "Settings updated successfully" }),
    ))
}

/// 发送一条固定的测试消息；请求里没给的目标从已保存的设置补全，不看启用开关
async fn test_telegram(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TestNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let store = &state.settings;

    let bot_token = if is_masked_or_empty(&payload.bot_token) {
        let stored = store
            .get(keys::TELEGRAM_BOT_TOKEN)
            .await
            .map_err(|err| {
                warn!(error = %err, "stored bot token unavailable");
                AppError::BadRequest(
                    "Bot token not found in database. Please set it first.".to_string(),
                )
            })?;
        if stored.is_empty() {
            return Err(AppError::BadRequest(
                "Bot token is empty. Please set it first.".to_string(),
            ));
        }
        stored
    } else {
        payload.bot_token
    };

    let chat_id = if is_masked_or_empty(&payload.chat_id) {
        store.get_with_default(keys::TELEGRAM_CHAT_ID, "").await
    } else {
        payload.chat_id
    };
    if chat_id.is_empty() {
        return Err(AppError::BadRequest("Chat ID is required".to_string()));
    }

    let site_name = text_or_default(store, keys::SITE_NAME).await;
    state
        .notifier
        .send_test(&Destination::new(bot_token, chat_id), &site_name)
        .await
        .map_err(|err| AppError::BadRequest(format!("Failed to send test message: {err}")))?;

    info!("telegram test message sent");
    Ok(Json(
        serde_json::json!({ "message": "Telegram test completed successfully" }),
    ))
}

#[cfg(test)]
mod tests {
    use crate::app::axum_app;
    use crate::services::settings::keys;
    use crate::state::{AppState, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use httpmock::prelude::*;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn call(state: &AppState, request: Request<Body>) -> Response {
        axum_app(Arc::new(state.clone()))
            .oneshot(request)
            .await
            .unwrap()
    }

    fn full_settings(bot_token: &str) -> Value {
        json!({
            "telegram": {
                "enabled": true,
                "botToken": bot_token,
                "chatId": "-100",
                "notifyOnNewRequest": false,
                "notifyOnStatusChange": true,
                "notifyOnAssignment": true,
                "notifyOnCompletion": false
            },
            "system": {
                "siteName": "Dorm Maintenance",
                "siteDescription": "Building services",
                "adminEmail": "ops@example.com",
                "autoAssignTechnicians": true,
                "requireApproval": false,
                "defaultPriority": "high",
                "maintenanceMode": false
            }
        })
    }

    #[tokio::test]
    async fn test_get_settings_seeds_and_masks() {
        let state = test_state("http://127.0.0.1:1").await;
        state
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, "123:abc")
            .await
            .unwrap();

        let request = Request::builder()
            .uri("/api/settings")
            .body(Body::empty())
            .unwrap();
        let response = call(&state, request).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["telegram"]["botToken"], "***hidden***");
        assert_eq!(body["telegram"]["enabled"], false);
        assert_eq!(body["telegram"]["chatId"], "");
        assert_eq!(body["telegram"]["notifyOnCompletion"], true);
        assert_eq!(body["system"]["siteName"], "Repair System");
        assert_eq!(body["system"]["requireApproval"], true);
        assert_eq!(body["system"]["defaultPriority"], "medium");
        assert!(!body.to_string().contains("123:abc"));
    }

    #[tokio::test]
    async fn test_update_then_read_back() {
        let state = test_state("http://127.0.0.1:1").await;

        let response = call(
            &state,
            json_request("PUT", "/api/settings", full_settings("555:new")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Settings updated successfully"
        );

        let store = &state.settings;
        assert_eq!(store.get(keys::TELEGRAM_BOT_TOKEN).await.unwrap(), "555:new");
        assert_eq!(store.get(keys::SITE_NAME).await.unwrap(), "Dorm Maintenance");
        assert!(!store.get_bool(keys::TELEGRAM_NOTIFY_NEW_REQUEST).await);
        assert!(store.get_bool(keys::AUTO_ASSIGN_TECHNICIANS).await);

        let request = Request::builder()
            .uri("/api/settings")
            .body(Body::empty())
            .unwrap();
        let body = body_json(call(&state, request).await).await;
        assert_eq!(body["telegram"]["chatId"], "-100");
        assert_eq!(body["telegram"]["notifyOnNewRequest"], false);
        assert_eq!(body["system"]["adminEmail"], "ops@example.com");
    }

    #[tokio::test]
    async fn test_masked_or_empty_token_keeps_stored_value() {
        let state = test_state("http://127.0.0.1:1").await;
        state
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, "123:original")
            .await
            .unwrap();

        for token in ["***hidden***", ""] {
            let response = call(
                &state,
                json_request("PUT", "/api/settings", full_settings(token)),
            )
            .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                state.settings.get(keys::TELEGRAM_BOT_TOKEN).await.unwrap(),
                "123:original"
            );
        }
    }

    #[tokio::test]
    async fn test_telegram_test_requires_stored_token() {
        let state = test_state("http://127.0.0.1:1").await;

        let response = call(
            &state,
            json_request("POST", "/api/settings/test-telegram", json!({ "botToken": "***hidden***" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Bot token not found in database. Please set it first."
        );
    }

    #[tokio::test]
    async fn test_telegram_test_rejects_empty_stored_token() {
        let state = test_state("http://127.0.0.1:1").await;
        state
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, "")
            .await
            .unwrap();

        let response = call(
            &state,
            json_request("POST", "/api/settings/test-telegram", json!({})),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Bot token is empty. Please set it first."
        );
    }

    #[tokio::test]
    async fn test_telegram_test_requires_chat_id() {
        let state = test_state("http://127.0.0.1:1").await;

        let response = call(
            &state,
            json_request("POST", "/api/settings/test-telegram", json!({ "botToken": "123:abc" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Chat ID is required");
    }

    #[tokio::test]
    async fn test_telegram_test_uses_stored_values() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:stored/sendMessage")
                    .body_includes("\"chat_id\":\"-42\"")
                    .body_includes("Repair System");
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;

        let state = test_state(&server.base_url()).await;
        state.settings.initialize_defaults().await.unwrap();
        state
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, "123:stored")
            .await
            .unwrap();
        state
            .settings
            .set(keys::TELEGRAM_CHAT_ID, "-42")
            .await
            .unwrap();

        let response = call(
            &state,
            json_request("POST", "/api/settings/test-telegram", json!({ "botToken": "***hidden***" })),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await["message"],
            "Telegram test completed successfully"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_test_masked_fields_use_stored_values() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/bot123:stored/sendMessage")
                    .body_includes("\"chat_id\":\"-42\"");
                then.status(200).json_body(json!({ "ok": true }));
            })
            .await;

        let state = test_state(&server.base_url()).await;
        state
            .settings
            .set(keys::TELEGRAM_BOT_TOKEN, "123:stored")
            .await
            .unwrap();
        state
            .settings
            .set(keys::TELEGRAM_CHAT_ID, "-42")
            .await
            .unwrap();

        let response = call(
            &state,
            json_request(
                "POST",
                "/api/settings/test-telegram",
                json!({ "botToken": "***hidden***", "chatId": "***hidden***" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_telegram_test_reports_send_failure() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/botexplicit/sendMessage");
                then.status(401).json_body(json!({ "ok": false, "description": "Unauthorized" }));
            })
            .await;

        let state = test_state(&server.base_url()).await;

        let response = call(
            &state,
            json_request(
                "POST",
                "/api/settings/test-notification",
                json!({ "botToken": "explicit", "chatId": "-1" }),
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Failed to send test message: telegram API returned status: 401"
        );
        mock.assert_calls_async(1).await;
    }
}
