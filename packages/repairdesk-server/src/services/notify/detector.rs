use repairdesk_core::{NotificationEvent, TicketSnapshot, TicketStatus, UserRef};

/// 比较变更前后的快照，按固定顺序给出要发送的通知。
///
/// 创建（`before` 为空）只产生 `NewTicket`。更新时各规则独立判断：
/// 状态变化、技术员变更为非空、当前状态为已完成、当前状态为已拒绝且有理由。
/// 已完成的报修单再次保存也会再次产生 `Completed`。
pub(crate) fn detect(
    before: Option<&TicketSnapshot>,
    after: &TicketSnapshot,
    actor: Option<&UserRef>,
) -> Vec<NotificationEvent> {
    let Some(before) = before else {
        return vec![NotificationEvent::NewTicket {
            ticket: after.clone(),
        }];
    };

    let mut events = Vec::new();

    if after.status != before.status {
        events.push(NotificationEvent::StatusChanged {
            from: before.status.clone(),
            to: after.status.clone(),
            ticket: after.clone(),
        });
    }

    if after.technician_id() != before.technician_id() {
        if let Some(technician) = &after.technician {
            events.push(NotificationEvent::Assigned {
                technician: technician.clone(),
                ticket: after.clone(),
            });
        }
    }

    if after.status == TicketStatus::Completed {
        events.push(NotificationEvent::Completed {
            technician: after.technician.clone(),
            ticket: after.clone(),
        });
    }

    if after.status == TicketStatus::Rejected && !after.rejection_reason.is_empty() {
        events.push(NotificationEvent::Rejected {
            reason: after.rejection_reason.clone(),
            actor: actor.cloned(),
            ticket: after.clone(),
        });
    }

    events
}
