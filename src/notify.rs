//! Collaborators notified on terminal transitions: toast-style notifications and
//! cached-query invalidation

use crate::constants::{COLOR_ERROR, COLOR_SUCCESS};
use crate::types::{TransactionRecord, TransactionState};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationLink {
    pub link: String,
    pub label: String,
}

/// Message shown to the user when a transaction finishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub color: &'static str,
    pub links: Vec<NotificationLink>,
}

impl Notification {
    /// Build the notification for a terminal record, `None` if it is still in flight
    pub fn from_record(record: &TransactionRecord) -> Option<Self> {
        let (kind, color) = match record.state {
            TransactionState::Success => (NotificationKind::Success, COLOR_SUCCESS),
            TransactionState::Error => (NotificationKind::Error, COLOR_ERROR),
            _ => return None,
        };

        let links = record
            .explorer_link
            .iter()
            .map(|link| NotificationLink {
                link: link.clone(),
                label: "View on explorer".to_string(),
            })
            .collect();

        Some(Self {
            message: record.message.clone(),
            kind,
            color,
            links,
        })
    }
}

/// Receives terminal notifications (toasts in a UI)
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Invalidates cached reads for a query key
pub trait QueryInvalidator: Send + Sync {
    fn invalidate(&self, query_key: &[String]);
}

/// Notification sink that writes to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => tracing::info!("{}", notification.message),
            NotificationKind::Error => tracing::warn!("{}", notification.message),
        }
    }
}

/// Invalidator for clients without a query cache
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInvalidator;

impl QueryInvalidator for LogInvalidator {
    fn invalidate(&self, query_key: &[String]) {
        tracing::debug!("Invalidating queries for {:?}", query_key);
    }
}
