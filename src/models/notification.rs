use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::models::traits::INotificationSink;

/// 実績解除通知の表示時間（ミリ秒）
pub const ACHIEVEMENT_NOTIFICATION_MS: u64 = 6000;

/// 通知の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Achievement,
    Success,
    Info,
    Warning,
}

/// 通知イベント
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub duration_ms: u64,
}

impl Notification {
    pub fn achievement(title: &str, message: &str) -> Self {
        Self {
            kind: NotificationKind::Achievement,
            title: title.to_string(),
            message: message.to_string(),
            duration_ms: ACHIEVEMENT_NOTIFICATION_MS,
        }
    }
}

/// tracingへ出力するだけの通知先
#[derive(Debug, Default)]
pub struct LogSink;

impl INotificationSink for LogSink {
    fn notify(&mut self, notification: Notification) {
        info!(
            kind = ?notification.kind,
            duration_ms = notification.duration_ms,
            "🏆 {}: {}",
            notification.title,
            notification.message
        );
    }
}

/// 単一の受信者へチャネル経由で転送する通知先
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<Notification>) -> Self {
        Self { sender }
    }
}

impl INotificationSink for ChannelSink {
    fn notify(&mut self, notification: Notification) {
        // 受信側が閉じていても訓練処理は継続する
        if let Err(e) = self.sender.send(notification) {
            warn!("通知の送信に失敗しました: {}", e.0.title);
        }
    }
}

/// 受け取った通知を保持する通知先
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub notifications: Vec<Notification>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn titles(&self) -> Vec<&str> {
        self.notifications.iter().map(|n| n.title.as_str()).collect()
    }
}

impl INotificationSink for RecordingSink {
    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_achievement_notification() {
        let n = Notification::achievement("Point Collector", "You have earned 100 total points in training!");
        assert_eq!(n.kind, NotificationKind::Achievement);
        assert_eq!(n.duration_ms, 6000);
    }

    #[test]
    fn test_recording_sink() {
        let mut sink = RecordingSink::new();
        sink.notify(Notification::achievement("A", "a"));
        sink.notify(Notification::achievement("B", "b"));
        assert_eq!(sink.titles(), vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_to_single_consumer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut sink = ChannelSink::new(tx);
        sink.notify(Notification::achievement("Mission Specialist", "first mission"));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "Mission Specialist");
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.notify(Notification::achievement("A", "a"));
    }
}
