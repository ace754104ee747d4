use serde::Serialize;

use crate::models::buoyancy;
use crate::models::common::DEFAULT_BODY_WEIGHT_KG;

/// 宇宙飛行士の累積統計記録
///
/// 訓練画面が単独で所有し、浮力セッション・ミッショントラッカー・月面シミュレーションへ
/// 可変参照として渡されます。各サブシステムは独自のコピーを持ちません。
///
/// `total_score` と `completed_missions` は減少しません。複数項目を同時に更新する操作は
/// 単一のメソッド呼び出しで完結させ、途中状態が観測されないようにしています。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AstronautStats {
    /// 申告体重（kg）
    body_weight_kg: f64,
    /// 追加バラスト（kg）
    added_weight_kg: f64,
    /// 追加フロート数
    added_floaty_units: u32,
    /// 完了ミッション数
    completed_missions: u32,
    /// 累積スコア
    total_score: u32,
    /// 変更のたびに増加するリビジョン番号
    #[serde(skip)]
    revision: u64,
}

impl Default for AstronautStats {
    fn default() -> Self {
        Self::new(DEFAULT_BODY_WEIGHT_KG)
    }
}

impl AstronautStats {
    pub fn new(body_weight_kg: f64) -> Self {
        Self {
            body_weight_kg,
            added_weight_kg: 0.0,
            added_floaty_units: 0,
            completed_missions: 0,
            total_score: 0,
            revision: 0,
        }
    }

    /// 既存の進捗から記録を復元
    pub fn with_progress(body_weight_kg: f64, completed_missions: u32, total_score: u32) -> Self {
        Self {
            completed_missions,
            total_score,
            ..Self::new(body_weight_kg)
        }
    }

    pub fn body_weight_kg(&self) -> f64 {
        self.body_weight_kg
    }

    pub fn added_weight_kg(&self) -> f64 {
        self.added_weight_kg
    }

    pub fn added_floaty_units(&self) -> u32 {
        self.added_floaty_units
    }

    pub fn completed_missions(&self) -> u32 {
        self.completed_missions
    }

    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn target_buoyancy(&self) -> f64 {
        buoyancy::target_buoyancy(self.body_weight_kg)
    }

    pub fn current_buoyancy(&self) -> f64 {
        buoyancy::current_buoyancy(self.added_weight_kg, self.added_floaty_units)
    }

    /// 浮力差（現在 - 目標）
    pub fn buoyancy_difference(&self) -> f64 {
        self.current_buoyancy() - self.target_buoyancy()
    }

    /// 浮力制御スキル（%）。200ポイントで100%
    pub fn buoyancy_skill_percent(&self) -> f64 {
        (f64::from(self.total_score) / 200.0 * 100.0).min(100.0)
    }

    /// ミッション経験（%）。10ミッションで100%
    pub fn mission_experience_percent(&self) -> f64 {
        (f64::from(self.completed_missions) / 10.0 * 100.0).min(100.0)
    }

    pub(crate) fn set_body_weight(&mut self, body_weight_kg: f64) {
        if self.body_weight_kg != body_weight_kg {
            self.body_weight_kg = body_weight_kg;
            self.revision += 1;
        }
    }

    pub(crate) fn set_added_weight(&mut self, added_weight_kg: f64) {
        if self.added_weight_kg != added_weight_kg {
            self.added_weight_kg = added_weight_kg;
            self.revision += 1;
        }
    }

    pub(crate) fn set_floaty_units(&mut self, units: u32) {
        if self.added_floaty_units != units {
            self.added_floaty_units = units;
            self.revision += 1;
        }
    }

    /// バラストとフロートを同時に初期化
    pub(crate) fn clear_ballast(&mut self) {
        if self.added_weight_kg != 0.0 || self.added_floaty_units != 0 {
            self.added_weight_kg = 0.0;
            self.added_floaty_units = 0;
            self.revision += 1;
        }
    }

    /// 浮力テスト成功: ミッション数+1とスコア加算を一括で適用
    pub fn record_training_success(&mut self, reward: u32) {
        self.completed_missions += 1;
        self.total_score += reward;
        self.revision += 1;
    }

    /// タスク完了: ポイント加算と（最終タスクなら）ミッション数+1を一括で適用
    pub fn record_task_completion(&mut self, points: u32, mission_complete: bool) {
        self.total_score += points;
        if mission_complete {
            self.completed_missions += 1;
        }
        self.revision += 1;
    }

    /// ミッション数を変えずにポイントのみ加算
    pub fn award_points(&mut self, points: u32) {
        if points > 0 {
            self.total_score += points;
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_stats() {
        let stats = AstronautStats::default();
        assert_eq!(stats.body_weight_kg(), 70.0);
        assert_eq!(stats.total_score(), 0);
        assert_eq!(stats.completed_missions(), 0);
        assert_eq!(stats.revision(), 0);
    }

    #[test]
    fn test_training_success_updates_both_counters() {
        let mut stats = AstronautStats::default();
        stats.record_training_success(100);
        assert_eq!(stats.completed_missions(), 1);
        assert_eq!(stats.total_score(), 100);
        assert_eq!(stats.revision(), 1);
    }

    #[test]
    fn test_task_completion() {
        let mut stats = AstronautStats::default();
        stats.record_task_completion(10, false);
        assert_eq!(stats.total_score(), 10);
        assert_eq!(stats.completed_missions(), 0);
        stats.record_task_completion(15, true);
        assert_eq!(stats.total_score(), 25);
        assert_eq!(stats.completed_missions(), 1);
    }

    #[test]
    fn test_unchanged_setter_keeps_revision() {
        let mut stats = AstronautStats::default();
        stats.set_added_weight(0.0);
        stats.set_floaty_units(0);
        stats.clear_ballast();
        assert_eq!(stats.revision(), 0);
        stats.set_added_weight(2.0);
        assert_eq!(stats.revision(), 1);
    }

    #[test]
    fn test_skill_levels_are_capped() {
        let stats = AstronautStats::with_progress(70.0, 3, 150);
        assert_eq!(stats.buoyancy_skill_percent(), 75.0);
        assert_eq!(stats.mission_experience_percent(), 30.0);

        let veteran = AstronautStats::with_progress(70.0, 25, 900);
        assert_eq!(veteran.buoyancy_skill_percent(), 100.0);
        assert_eq!(veteran.mission_experience_percent(), 100.0);
    }

    #[test]
    fn test_buoyancy_difference() {
        let mut stats = AstronautStats::new(75.0);
        stats.set_added_weight(2.0);
        stats.set_floaty_units(1);
        assert_eq!(stats.target_buoyancy(), 2.5);
        assert_eq!(stats.current_buoyancy(), 0.5);
        assert_eq!(stats.buoyancy_difference(), -2.0);
    }
}
