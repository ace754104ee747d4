use serde::Serialize;
use tracing::{debug, info};

use crate::error::Rejection;
use crate::models::{
    buoyancy::{self, BuoyancyStatus, TestOutcome},
    common::{AgentEvent, TrainingConstants, MAX_BODY_WEIGHT_KG, MIN_BODY_WEIGHT_KG, TIME_EPSILON},
    progress::AstronautStats,
    traits::ITrainingAgent,
};

/// 浮力訓練セッションのフェーズ
///
/// `Setup → Adjust → Testing → Result` の順に前進のみ遷移し、
/// `Result` からは `reset` で `Setup` に戻ります。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrainingPhase {
    /// 体重の申告待ち
    Setup,
    /// バラスト・フロート調整中
    Adjust,
    /// 浮力テスト実行中（中断不可）
    Testing,
    /// 判定結果の表示
    Result,
}

/// 浮力訓練セッション
///
/// 1回の「浮力制御」アクティビティを駆動する状態機械です。
/// バラスト・フロート・体重は共有の [`AstronautStats`] に保持され、
/// セッション自身はフェーズ・判定結果・テスト残り時間のみを持ちます。
#[derive(Debug, Clone)]
pub struct TrainingSession {
    /// 現在のフェーズ
    phase: TrainingPhase,
    /// 直近のテスト判定結果（未判定ならNone）
    result: Option<TestOutcome>,
    /// 浮力テストの残り時間（秒）
    test_remaining_s: f64,
    /// 訓練パラメータ
    constants: TrainingConstants,
    /// 完了したテスト回数
    tests_completed: u32,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self::new(TrainingConstants::default())
    }
}

impl TrainingSession {
    pub fn new(constants: TrainingConstants) -> Self {
        Self {
            phase: TrainingPhase::Setup,
            result: None,
            test_remaining_s: 0.0,
            constants,
            tests_completed: 0,
        }
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn result(&self) -> Option<TestOutcome> {
        self.result
    }

    pub fn test_remaining_s(&self) -> f64 {
        self.test_remaining_s
    }

    pub fn tests_completed(&self) -> u32 {
        self.tests_completed
    }

    pub fn constants(&self) -> &TrainingConstants {
        &self.constants
    }

    /// 体重を申告して調整フェーズへ移行
    pub fn start(&mut self, stats: &mut AstronautStats, body_weight_kg: f64) -> Result<(), Rejection> {
        self.require_phase(TrainingPhase::Setup, "start")?;

        if !(MIN_BODY_WEIGHT_KG..=MAX_BODY_WEIGHT_KG).contains(&body_weight_kg) {
            debug!("体重 {:.1}kg は範囲外のため開始を却下", body_weight_kg);
            return Err(Rejection::BodyWeightOutOfRange(body_weight_kg));
        }

        stats.set_body_weight(body_weight_kg);
        self.phase = TrainingPhase::Adjust;
        debug!(
            "セッション開始: 体重 {:.1}kg, 目標浮力 {:.1}kg",
            body_weight_kg,
            stats.target_buoyancy()
        );
        Ok(())
    }

    /// バラストを増減（0〜上限でクランプ）
    pub fn adjust_weight(&mut self, stats: &mut AstronautStats, delta_kg: f64) -> Result<(), Rejection> {
        self.require_phase(TrainingPhase::Adjust, "adjust_weight")?;

        let adjusted = (stats.added_weight_kg() + delta_kg).clamp(0.0, self.constants.max_added_weight_kg);
        stats.set_added_weight(adjusted);
        debug!("バラスト: {:.1}kg", adjusted);
        Ok(())
    }

    /// フロート数を増減（0未満にはならない）
    pub fn adjust_floaties(&mut self, stats: &mut AstronautStats, delta: i32) -> Result<(), Rejection> {
        self.require_phase(TrainingPhase::Adjust, "adjust_floaties")?;

        let adjusted = stats.added_floaty_units().saturating_add_signed(delta);
        stats.set_floaty_units(adjusted);
        debug!("フロート: {}個", adjusted);
        Ok(())
    }

    /// 浮力テストを開始
    ///
    /// 所要時間の経過後、`tick` 内で判定して `Result` へ遷移します。
    pub fn run_test(&mut self) -> Result<(), Rejection> {
        self.require_phase(TrainingPhase::Adjust, "run_test")?;

        self.phase = TrainingPhase::Testing;
        self.test_remaining_s = self.constants.test_duration_s;
        self.result = None;
        debug!("浮力テスト開始 ({:.1}秒)", self.test_remaining_s);
        Ok(())
    }

    /// 結果フェーズから設定フェーズへ戻す
    pub fn reset(&mut self, stats: &mut AstronautStats) -> Result<(), Rejection> {
        self.require_phase(TrainingPhase::Result, "reset")?;

        stats.clear_ballast();
        self.result = None;
        self.test_remaining_s = 0.0;
        self.phase = TrainingPhase::Setup;
        debug!("セッションをリセット");
        Ok(())
    }

    /// 表示用の水深（m）
    pub fn depth_m(&self, stats: &AstronautStats) -> f64 {
        buoyancy::depth_fraction(
            self.phase,
            stats.buoyancy_difference(),
            self.constants.tolerance_kg,
            self.constants.pool_depth_m,
        )
    }

    /// 現在の浮力状態の表示区分
    pub fn status(&self, stats: &AstronautStats) -> BuoyancyStatus {
        let difference = stats.buoyancy_difference();
        BuoyancyStatus::from_difference_within(difference, self.constants.tolerance_kg)
    }

    fn require_phase(&self, expected: TrainingPhase, operation: &'static str) -> Result<(), Rejection> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(Rejection::IllegalTransition {
                phase: self.phase,
                operation,
            })
        }
    }

    fn complete_test(&mut self, stats: &mut AstronautStats) -> TestOutcome {
        let difference = stats.buoyancy_difference();
        let outcome = buoyancy::classify_within(difference, self.constants.tolerance_kg);

        self.result = Some(outcome);
        self.phase = TrainingPhase::Result;
        self.test_remaining_s = 0.0;
        self.tests_completed += 1;

        if outcome == TestOutcome::Success {
            stats.record_training_success(self.constants.success_reward);
        }

        info!(
            "浮力テスト完了: 目標 {:.1}kg / 現在 {:.1}kg / 差 {:+.1}kg → {:?}",
            stats.target_buoyancy(),
            stats.current_buoyancy(),
            difference,
            outcome
        );
        outcome
    }
}

impl ITrainingAgent for TrainingSession {
    fn tick(&mut self, dt: f64, stats: &mut AstronautStats) -> Option<AgentEvent> {
        if self.phase != TrainingPhase::Testing {
            return None;
        }

        self.test_remaining_s -= dt;
        if self.test_remaining_s <= TIME_EPSILON {
            let outcome = self.complete_test(stats);
            return Some(AgentEvent::TestCompleted(outcome));
        }
        None
    }

    fn get_id(&self) -> String {
        "buoyancy_session".to_string()
    }

    fn is_active(&self) -> bool {
        self.phase == TrainingPhase::Testing
    }
}
