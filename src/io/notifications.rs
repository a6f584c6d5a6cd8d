//! Local notification scheduling seam

use tracing::info;

/// A local notification with an optional image attachment
#[derive(Debug, Clone, PartialEq)]
pub struct LocalNotification {
    pub id: u32,
    pub title: String,
    pub text: String,
    pub attachment: Option<String>,
    /// Present the notification even while the app is foregrounded
    pub foreground: bool,
}

/// Opaque local-notification capability
pub trait Notifier: Send {
    fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()>;
}

/// Headless notifier: schedules by logging
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn schedule(&self, notification: &LocalNotification) -> anyhow::Result<()> {
        info!(
            id = %notification.id,
            title = %notification.title,
            attachment = notification.attachment.as_deref().unwrap_or(""),
            foreground = %notification.foreground,
            "notification_scheduled"
        );
        Ok(())
    }
}
