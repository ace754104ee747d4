// 基本的な定数とユーティリティ
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// 共有の統計記録
pub mod progress;

// 各訓練モデルの実装
pub mod buoyancy;
pub mod session;
pub mod missions;
pub mod achievements;
pub mod lunar;
pub mod notification;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use progress::AstronautStats;
pub use buoyancy::{BuoyancyStatus, TestOutcome};
pub use session::{TrainingPhase, TrainingSession};
pub use missions::{Countdown, Mission, MissionProgress, MissionTaskTracker, Task, TaskStatus};
pub use achievements::{Achievement, AchievementEvaluator, AchievementId, AchievementRule};
pub use lunar::{LunarPhase, LunarSimulation, Rock};
pub use notification::{ChannelSink, LogSink, Notification, NotificationKind, RecordingSink};
