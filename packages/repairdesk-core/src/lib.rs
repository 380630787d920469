use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 读取设置时代替敏感值返回的占位符，写入时表示“保持不变”
pub const MASKED_SECRET: &str = "***hidden***";

/// 空字符串或占位符都视为调用方没有提供新值
pub fn is_masked_or_empty(value: &str) -> bool {
    value.is_empty() || value == MASKED_SECRET
}

/// 报修单状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketStatus {
    #[default]
    Pending,
    InProgress,
    WaitingPart,
    Completed,
    Rejected,
    /// 未知状态，原样保留
    Other(String),
}

impl TicketStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::WaitingPart => "waiting_part",
            TicketStatus::Completed => "completed",
            TicketStatus::Rejected => "rejected",
            TicketStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for TicketStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => TicketStatus::Pending,
            "in_progress" => TicketStatus::InProgress,
            "waiting_part" => TicketStatus::WaitingPart,
            "completed" => TicketStatus::Completed,
            "rejected" => TicketStatus::Rejected,
            _ => TicketStatus::Other(value),
        }
    }
}

impl From<TicketStatus> for String {
    fn from(value: TicketStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 报修单优先级
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
    /// 未知优先级，原样保留
    Other(String),
}

impl TicketPriority {
    pub fn as_str(&self) -> &str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
            TicketPriority::Other(raw) => raw,
        }
    }
}

impl From<String> for TicketPriority {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => TicketPriority::Low,
            "medium" => TicketPriority::Medium,
            "high" => TicketPriority::High,
            "urgent" => TicketPriority::Urgent,
            _ => TicketPriority::Other(value),
        }
    }
}

impl From<TicketPriority> for String {
    fn from(value: TicketPriority) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 用户引用（报修人、技术员、操作管理员）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: i64,
    pub username: String,
    pub full_name: String,
}

/// 报修单在一次变更前后的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub priority: TicketPriority,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub requester: Option<UserRef>,
    #[serde(default)]
    pub technician: Option<UserRef>,
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

impl TicketSnapshot {
    pub fn technician_id(&self) -> Option<i64> {
        self.technician.as_ref().map(|t| t.id)
    }
}

/// 一次报修单变更：创建时 `before` 为空
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketMutation {
    #[serde(default)]
    pub before: Option<TicketSnapshot>,
    pub after: TicketSnapshot,
    /// 执行本次变更的用户，由调用方从会话中提供
    #[serde(default)]
    pub actor: Option<UserRef>,
}

/// 通知类别，用于查找对应的开关
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    NewTicket,
    StatusChanged,
    Assigned,
    Completed,
    Rejected,
}

/// 一次变更触发的通知事件
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    NewTicket {
        ticket: TicketSnapshot,
    },
    StatusChanged {
        from: TicketStatus,
        to: TicketStatus,
        ticket: TicketSnapshot,
    },
    Assigned {
        technician: UserRef,
        ticket: TicketSnapshot,
    },
    Completed {
        technician: Option<UserRef>,
        ticket: TicketSnapshot,
    },
    Rejected {
        reason: String,
        actor: Option<UserRef>,
        ticket: TicketSnapshot,
    },
}

impl NotificationEvent {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationEvent::NewTicket { .. } => NotificationKind::NewTicket,
            NotificationEvent::StatusChanged { .. } => NotificationKind::StatusChanged,
            NotificationEvent::Assigned { .. } => NotificationKind::Assigned,
            NotificationEvent::Completed { .. } => NotificationKind::Completed,
            NotificationEvent::Rejected { .. } => NotificationKind::Rejected,
        }
    }

    pub fn ticket(&self) -> &TicketSnapshot {
        match self {
            NotificationEvent::NewTicket { ticket }
            | NotificationEvent::StatusChanged { ticket, .. }
            | NotificationEvent::Assigned { ticket, .. }
            | NotificationEvent::Completed { ticket, .. }
            | NotificationEvent::Rejected { ticket, .. } => ticket,
        }
    }
}

/// Telegram 通知设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramSettings {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
    pub notify_on_new_request: bool,
    pub notify_on_status_change: bool,
    pub notify_on_assignment: bool,
    pub notify_on_completion: bool,
}

/// 系统设置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemSettings {
    pub site_name: String,
    pub site_description: String,
    pub admin_email: String,
    pub auto_assign_technicians: bool,
    pub require_approval: bool,
    pub default_priority: String,
    pub maintenance_mode: bool,
}

/// `GET/PUT /api/settings` 的请求与响应体
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub system: SystemSettings,
}

/// 测试通知请求，字段为空或为占位符时使用已保存的值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestNotificationRequest {
    pub bot_token: String,
    pub chat_id: String,
}
