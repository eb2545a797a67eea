use app_logger::error;
use notify_rust::{Notification, Timeout, Urgency};

use app_config::APPLICATION_NAME;

/// Tell the desktop that a long running task ended.
pub fn task_finished(task: &str, result: &anyhow::Result<String>) {
    let (urgency, icon, title, message) = match result {
        Ok(message) => (
            Urgency::Low,
            "dialog-information",
            format!("{task} finished"),
            message.clone(),
        ),
        Err(e) => (
            Urgency::Normal,
            "dialog-error",
            format!("{task} failed"),
            format!("{e:#}"),
        ),
    };

    let mut notif = Notification::new();

    if cfg!(target_os = "linux") {
        notif.urgency(urgency);
    }

    let res = notif
        .appname(APPLICATION_NAME)
        .timeout(Timeout::Milliseconds(10_000))
        .summary(&title)
        .body(&message)
        .icon(icon)
        .show();

    if let Err(e) = res {
        error!("Error sending notification: {e}");
    }
}
