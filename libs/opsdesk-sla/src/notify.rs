//! Notification dispatch for classified alerts
//!
//! Every delivery is best-effort: failures are logged and swallowed, and a
//! failure for one recipient never blocks another.

use opsdesk_model::{SlaState, Ticket};
use tracing::warn;

use crate::traits::Notifier;

/// Send the notifications a classified state calls for.
///
/// Breach: assignee gets an urgent message, and the reporter (when distinct
/// from the assignee) gets a status message. Warning/critical: assignee
/// only; nothing is sent for an unassigned ticket.
///
/// Returns the number of deliveries that succeeded.
pub(crate) async fn dispatch<N: Notifier + ?Sized>(
    notifier: &N,
    ticket: &Ticket,
    state: &SlaState,
) -> usize {
    let kind = state.kind();
    let mut delivered = 0;

    match state {
        SlaState::Breach { hours_overdue } => {
            let deadline = ticket
                .sla_target
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "unknown".to_string());

            if let Some(assignee) = ticket.assignee_id {
                let message = format!(
                    "SLA breached: '{}' is {:.1}h past its resolution deadline ({})",
                    ticket.title, hours_overdue, deadline
                );
                match notifier
                    .notify(assignee, ticket.id, kind, &ticket.title, &message)
                    .await
                {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!("Breach notification to assignee failed: {}", e),
                }
            }

            if Some(ticket.reporter_id) != ticket.assignee_id {
                let message = format!(
                    "Your ticket '{}' has exceeded its resolution target and has been escalated",
                    ticket.title
                );
                match notifier
                    .notify(ticket.reporter_id, ticket.id, kind, &ticket.title, &message)
                    .await
                {
                    Ok(()) => delivered += 1,
                    Err(e) => warn!("Breach notification to reporter failed: {}", e),
                }
            }
        },
        SlaState::Warning { hours_remaining } | SlaState::Critical { hours_remaining } => {
            let Some(assignee) = ticket.assignee_id else {
                return 0;
            };
            let message = format!(
                "SLA {}: '{}' has {:.1}h remaining before its resolution deadline",
                kind, ticket.title, hours_remaining
            );
            match notifier
                .notify(assignee, ticket.id, kind, &ticket.title, &message)
                .await
            {
                Ok(()) => delivered += 1,
                Err(e) => warn!("{} notification to assignee failed: {}", kind, e),
            }
        },
    }

    delivered
}
