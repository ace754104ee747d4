use crate::error::StoreError;
use crate::models::common::AgentEvent;
use crate::models::notification::Notification;
use crate::models::progress::AstronautStats;

/// 時間駆動される全ての訓練エージェントが実装する基本インターフェース
pub trait ITrainingAgent {
    /// 1ティックの処理実行
    ///
    /// 統計記録を変更する場合は引数で渡された記録のみを更新します。
    fn tick(&mut self, dt: f64, stats: &mut AstronautStats) -> Option<AgentEvent>;

    /// エージェントIDの取得
    fn get_id(&self) -> String;

    /// 時間経過を伴う処理が進行中かどうか
    fn is_active(&self) -> bool;
}

/// 通知の受け取り先
///
/// 送りっぱなしで応答は不要です。
pub trait INotificationSink {
    fn notify(&mut self, notification: Notification);
}

/// 永続キーバリューストア
pub trait IKeyValueStore {
    /// キーに対応する値の取得
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// キーに値を書き込む
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}
