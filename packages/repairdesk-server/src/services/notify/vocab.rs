//! Thai vocabulary for priorities and statuses. Unknown values keep their raw text.

use repairdesk_core::{TicketPriority, TicketStatus};

pub(crate) fn priority_symbol(priority: &TicketPriority) -> &'static str {
    match priority {
        TicketPriority::Urgent => "🚨",
        TicketPriority::High => "🔴",
        TicketPriority::Medium => "🟡",
        TicketPriority::Low => "🟢",
        TicketPriority::Other(_) => "⚪",
    }
}

pub(crate) fn priority_label(priority: &TicketPriority) -> &str {
    match priority {
        TicketPriority::Urgent => "เร่งด่วน",
        TicketPriority::High => "สูง",
        TicketPriority::Medium => "ปานกลาง",
        TicketPriority::Low => "ต่ำ",
        TicketPriority::Other(raw) => raw,
    }
}

pub(crate) fn status_symbol(status: &TicketStatus) -> &'static str {
    match status {
        TicketStatus::Pending => "⏳",
        TicketStatus::InProgress => "🔧",
        TicketStatus::WaitingPart => "📦",
        TicketStatus::Completed => "✅",
        TicketStatus::Rejected => "❌",
        TicketStatus::Other(_) => "❓",
    }
}

pub(crate) fn status_label(status: &TicketStatus) -> &str {
    match status {
        TicketStatus::Pending => "รอดำเนินการ",
        TicketStatus::InProgress => "กำลังดำเนินการ",
        TicketStatus::WaitingPart => "รออะไหล่",
        TicketStatus::Completed => "เสร็จสิ้น",
        TicketStatus::Rejected => "ปฏิเสธ",
        TicketStatus::Other(raw) => raw,
    }
}
