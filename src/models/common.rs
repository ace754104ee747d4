use serde::{Deserialize, Serialize};

/// 申告体重の下限（kg）
pub const MIN_BODY_WEIGHT_KG: f64 = 40.0;
/// 申告体重の上限（kg）
pub const MAX_BODY_WEIGHT_KG: f64 = 150.0;
/// 初期体重（kg）
pub const DEFAULT_BODY_WEIGHT_KG: f64 = 70.0;

/// フロート1個あたりの浮力（kg換算、負方向）
pub const FLOATY_UNIT_KG: f64 = 1.5;
/// 目標浮力の除数。実際の物理ではなく簡略化した経験定数
pub const TARGET_BUOYANCY_DIVISOR: f64 = 30.0;
/// 中性浮力判定の許容幅（kg換算、両端を含む）
pub const NEUTRAL_TOLERANCE_KG: f64 = 2.0;

/// 浮力テスト成功時の固定報酬ポイント
pub const TRAINING_SUCCESS_REWARD: u32 = 100;

/// 時刻比較用の許容誤差（秒）
pub const TIME_EPSILON: f64 = 1e-9;

/// 訓練パラメータ
///
/// シナリオファイルの `training` セクションに対応します。
/// 省略された項目は既定値で補われます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConstants {
    /// 浮力テストの所要時間（秒、中断不可）
    pub test_duration_s: f64,
    /// 成功判定の許容幅（kg換算）
    pub tolerance_kg: f64,
    /// プール深度（m）。実際のNBLは約12m
    pub pool_depth_m: f64,
    /// テスト成功時の報酬ポイント
    pub success_reward: u32,
    /// バラストの上限（kg）
    pub max_added_weight_kg: f64,
}

impl Default for TrainingConstants {
    fn default() -> Self {
        Self {
            test_duration_s: 4.0,
            tolerance_kg: NEUTRAL_TOLERANCE_KG,
            pool_depth_m: 12.0,
            success_reward: TRAINING_SUCCESS_REWARD,
            max_added_weight_kg: 50.0,
        }
    }
}

/// エージェントのtickで発生したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// 浮力テストが完了した
    TestCompleted(crate::models::buoyancy::TestOutcome),
    /// ミッションのカウントダウンが0になった
    CountdownExpired { mission_id: String },
    /// 月面（プール底）に到達した
    LunarSurfaceReached,
}

/// 小数第1位で四捨五入
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 秒数を `m:ss` 形式に整形
pub fn format_time(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
