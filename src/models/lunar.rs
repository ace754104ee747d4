use serde::Serialize;
use tracing::{debug, info};

use crate::error::Rejection;
use crate::models::{common::AgentEvent, progress::AstronautStats, traits::ITrainingAgent};

/// 追加ウェイトの下限（kg）
pub const LUNAR_MIN_WEIGHT_KG: f64 = 2.0;
/// 追加ウェイトの上限（kg）
pub const LUNAR_MAX_WEIGHT_KG: f64 = 20.0;
/// 全岩石回収時の報酬ポイント
pub const LUNAR_COMPLETION_REWARD: u32 = 200;
/// 降下率を定義する基準時間刻み（秒）
const DESCENT_STEP_S: f64 = 0.1;

/// 月面シミュレーションのフェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LunarPhase {
    /// プール底へ降下中
    Descending,
    /// 月面（プール底）で岩石回収中
    OnSurface,
    /// 全岩石回収済み
    Complete,
}

/// 回収対象の岩石
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rock {
    pub id: u32,
    pub collected: bool,
}

/// 月面重力シミュレーション
///
/// プール底まで降下して月面の低重力を再現します。ウェイトを増やすほど速く降下し、
/// 底に到達したら岩石を回収します。
#[derive(Debug, Clone)]
pub struct LunarSimulation {
    phase: LunarPhase,
    added_weight_kg: f64,
    /// プール深度に対する現在深さ（%）
    depth_percent: f64,
    rocks: Vec<Rock>,
}

impl Default for LunarSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl LunarSimulation {
    pub fn new() -> Self {
        Self {
            phase: LunarPhase::Descending,
            added_weight_kg: LUNAR_MIN_WEIGHT_KG,
            depth_percent: 0.0,
            rocks: (1..=3).map(|id| Rock { id, collected: false }).collect(),
        }
    }

    pub fn phase(&self) -> LunarPhase {
        self.phase
    }

    pub fn added_weight_kg(&self) -> f64 {
        self.added_weight_kg
    }

    pub fn depth_percent(&self) -> f64 {
        self.depth_percent
    }

    pub fn rocks(&self) -> &[Rock] {
        &self.rocks
    }

    /// 0.1秒あたりの降下率（深度%）
    pub fn descent_rate(&self) -> f64 {
        ((self.added_weight_kg / 10.0 - 0.1) * 0.5).max(0.0)
    }

    /// 降下中のみウェイトを調整（整数kgに切り下げてから加算）
    pub fn adjust_weight(&mut self, delta_kg: f64) -> Result<(), Rejection> {
        if self.phase != LunarPhase::Descending {
            return Err(Rejection::IllegalLunarOperation {
                phase: self.phase,
                operation: "adjust_weight",
            });
        }

        self.added_weight_kg =
            (self.added_weight_kg.floor() + delta_kg).clamp(LUNAR_MIN_WEIGHT_KG, LUNAR_MAX_WEIGHT_KG);
        debug!(
            "月面ウェイト: {:.1}kg (降下率 {:.2}%/0.1s)",
            self.added_weight_kg,
            self.descent_rate()
        );
        Ok(())
    }

    /// 岩石を回収。最後の1個で完了となり報酬を加算
    pub fn collect_rock(&mut self, stats: &mut AstronautStats, rock_id: u32) -> Result<(), Rejection> {
        if self.phase != LunarPhase::OnSurface {
            return Err(Rejection::IllegalLunarOperation {
                phase: self.phase,
                operation: "collect_rock",
            });
        }

        let rock = self
            .rocks
            .iter_mut()
            .find(|r| r.id == rock_id && !r.collected)
            .ok_or(Rejection::RockUnavailable(rock_id))?;
        rock.collected = true;
        debug!("岩石 {} を回収", rock_id);

        if self.rocks.iter().all(|r| r.collected) {
            self.phase = LunarPhase::Complete;
            stats.award_points(LUNAR_COMPLETION_REWARD);
            info!("月面ミッション完了 (+{}pt)", LUNAR_COMPLETION_REWARD);
        }
        Ok(())
    }
}

impl ITrainingAgent for LunarSimulation {
    fn tick(&mut self, dt: f64, _stats: &mut AstronautStats) -> Option<AgentEvent> {
        if self.phase != LunarPhase::Descending {
            return None;
        }

        self.depth_percent = (self.depth_percent + self.descent_rate() * dt / DESCENT_STEP_S).min(100.0);
        if self.depth_percent >= 100.0 {
            self.phase = LunarPhase::OnSurface;
            info!("月面に到達しました");
            return Some(AgentEvent::LunarSurfaceReached);
        }
        None
    }

    fn get_id(&self) -> String {
        "lunar_simulation".to_string()
    }

    fn is_active(&self) -> bool {
        self.phase == LunarPhase::Descending
    }
}
