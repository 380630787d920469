use super::vocab::{priority_label, priority_symbol, status_label, status_symbol};
use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Utc};
use repairdesk_core::{NotificationEvent, TicketSnapshot, TicketStatus, UserRef};

/// 长文本字段的字符上限
pub(crate) const TEXT_LIMIT: usize = 100;

const UNSPECIFIED: &str = "ไม่ระบุ";
const UNASSIGNED: &str = "ยังไม่ได้มอบหมาย";
const NO_COST: &str = "ไม่มีค่าใช้จ่าย";

/// 把通知事件渲染成 Telegram HTML 消息。纯函数，不做 I/O。
#[derive(Debug, Clone, Copy)]
pub(crate) struct Renderer {
    offset: FixedOffset,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Utc.fix())
    }
}

impl Renderer {
    /// `offset` 决定消息里时间的显示时区
    pub(crate) fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub(crate) fn render(&self, event: &NotificationEvent, now: DateTime<Utc>) -> String {
        match event {
            NotificationEvent::NewTicket { ticket } => self.new_ticket(ticket),
            NotificationEvent::StatusChanged { from, to, ticket } => {
                self.status_changed(from, to, ticket, now)
            }
            NotificationEvent::Assigned { technician, ticket } => {
                self.assigned(technician, ticket, now)
            }
            NotificationEvent::Completed { technician, ticket } => {
                self.completed(technician.as_ref(), ticket)
            }
            NotificationEvent::Rejected {
                reason,
                actor,
                ticket,
            } => self.rejected(reason, actor.as_ref(), ticket, now),
        }
    }

    /// 测试通知的固定内容
    pub(crate) fn test_message(&self, site_name: &str, now: DateTime<Utc>) -> String {
        format!(
            "🔧 <b>ระบบแจ้งซ่อม - ทดสอบการแจ้งเตือน</b>\n\n\
             ✅ การเชื่อมต่อ Telegram Bot สำเร็จ!\n\
             📅 <b>เวลา:</b> {}\n\
             🔗 <b>ระบบ:</b> {}",
            self.timestamp(now),
            escape_html(site_name),
        )
    }

    fn timestamp(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset)
            .format("%d/%m/%Y %H:%M")
            .to_string()
    }

    fn new_ticket(&self, ticket: &TicketSnapshot) -> String {
        let priority_emoji = priority_symbol(&ticket.priority);
        let status_emoji = status_symbol(&ticket.status);
        let title = escape_html(&ticket.title);
        let requester = match &ticket.requester {
            Some(user) => format!(
                "{} ({})",
                escape_html(&user.full_name),
                escape_html(&user.username)
            ),
            None => UNSPECIFIED.to_string(),
        };

        format!(
            "🔧 <b>แจ้งซ่อมใหม่</b>\n\n\
             {priority_emoji} <b>{title}</b> {status_emoji}\n\n\
             📋 <b>รายละเอียด:</b>\n\
             • หัวข้อ: {title}\n\
             • รายละเอียด: {description}\n\
             • สถานที่: {location}\n\
             • ระดับความสำคัญ: {priority} {priority_emoji}\n\
             • สถานะ: {status} {status_emoji}\n\n\
             👤 <b>ผู้แจ้ง:</b> {requester}\n\
             🕐 <b>เวลา:</b> {created_at}\n\n\
             #แจ้งซ่อม #ใหม่ #{tag}",
            description = escape_html(&truncate_text(&ticket.description, TEXT_LIMIT)),
            location = location_text(&ticket.location),
            priority = escape_html(priority_label(&ticket.priority)),
            status = escape_html(status_label(&ticket.status)),
            created_at = self.timestamp(ticket.created_at),
            tag = escape_html(&ticket.priority.as_str().to_lowercase()),
        )
    }

    fn status_changed(
        &self,
        from: &TicketStatus,
        to: &TicketStatus,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> String {
        format!(
            "🔄 <b>เปลี่ยนสถานะงานซ่อม</b>\n\n\
             📋 <b>งาน:</b> {title}\n\n\
             🔄 <b>สถานะ:</b>\n\
             {from_emoji} {from_label} ➡️ {to_emoji} {to_label}\n\n\
             👤 <b>ช่าง:</b> {technician}\n\
             🕐 <b>เวลา:</b> {now}\n\n\
             #เปลี่ยนสถานะ #{tag}",
            title = escape_html(&ticket.title),
            from_emoji = status_symbol(from),
            from_label = escape_html(status_label(from)),
            to_emoji = status_symbol(to),
            to_label = escape_html(status_label(to)),
            technician = technician_name(ticket.technician.as_ref()),
            now = self.timestamp(now),
            tag = escape_html(&to.as_str().to_lowercase()),
        )
    }

    fn assigned(&self, technician: &UserRef, ticket: &TicketSnapshot, now: DateTime<Utc>) -> String {
        format!(
            "👷‍♂️ <b>มอบหมายงานซ่อม</b>\n\n\
             📋 <b>งาน:</b> {title}\n\
             🔧 <b>ช่างที่รับผิดชอบ:</b> {technician}\n\
             ⚡ <b>ระดับความสำคัญ:</b> {priority} {priority_emoji}\n\n\
             📍 <b>สถานที่:</b> {location}\n\
             📅 <b>เวลาที่มอบหมาย:</b> {now}\n\n\
             #มอบหมายงาน #{username}",
            title = escape_html(&ticket.title),
            technician = escape_html(&technician.full_name),
            priority = escape_html(priority_label(&ticket.priority)),
            priority_emoji = priority_symbol(&ticket.priority),
            location = location_text(&ticket.location),
            now = self.timestamp(now),
            username = escape_html(&technician.username),
        )
    }

    fn completed(&self, technician: Option<&UserRef>, ticket: &TicketSnapshot) -> String {
        let (duration, completed_at) = match ticket.completed_at {
            Some(completed_at) => (
                format_duration(completed_at - ticket.created_at),
                self.timestamp(completed_at),
            ),
            None => (UNSPECIFIED.to_string(), UNSPECIFIED.to_string()),
        };

        format!(
            "✅ <b>งานซ่อมเสร็จสิ้น</b>\n\n\
             📋 <b>งาน:</b> {title}\n\
             🔧 <b>ช่าง:</b> {technician}\n\
             ⏱️ <b>ระยะเวลา:</b> {duration}\n\
             💰 <b>ค่าใช้จ่าย:</b> {cost}\n\n\
             📅 <b>เสร็จสิ้นเมื่อ:</b> {completed_at}\n\n\
             #เสร็จสิ้น #สำเร็จ",
            title = escape_html(&ticket.title),
            technician = technician_name(technician),
            cost = cost_text(ticket.cost),
        )
    }

    fn rejected(
        &self,
        reason: &str,
        actor: Option<&UserRef>,
        ticket: &TicketSnapshot,
        now: DateTime<Utc>,
    ) -> String {
        format!(
            "❌ <b>ปฏิเสธงานซ่อม</b>\n\n\
             📋 <b>งาน:</b> {title}\n\
             👤 <b>ผู้ปฏิเสธ:</b> {actor}\n\n\
             📝 <b>เหตุผล:</b>\n\
             {reason}\n\n\
             📅 <b>เวลา:</b> {now}\n\n\
             #ปฏิเสธ #ยกเลิก",
            title = escape_html(&ticket.title),
            actor = actor
                .map(|user| escape_html(&user.full_name))
                .unwrap_or_else(|| UNSPECIFIED.to_string()),
            reason = escape_html(reason),
            now = self.timestamp(now),
        )
    }
}

/// 超过 `limit` 个字符时截断并加省略号
pub(crate) fn truncate_text(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit).collect();
    truncated.push_str("...");
    truncated
}

/// 不足一小时按分钟，不足一天按小时，否则按天，只取整
pub(crate) fn format_duration(elapsed: TimeDelta) -> String {
    let hours = elapsed.num_hours();
    if hours < 1 {
        format!("{} นาที", elapsed.num_minutes().max(0))
    } else if hours < 24 {
        format!("{hours} ชั่วโมง")
    } else {
        format!("{} วัน", hours / 24)
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn location_text(location: &str) -> String {
    if location.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        escape_html(location)
    }
}

fn technician_name(technician: Option<&UserRef>) -> String {
    match technician {
        Some(user) => escape_html(&user.full_name),
        None => UNASSIGNED.to_string(),
    }
}

fn cost_text(cost: f64) -> String {
    if cost > 0.0 {
        format!("{cost:.2} บาท")
    } else {
        NO_COST.to_string()
    }
}
