//! # 浮力モデル
//!
//! 中性浮力訓練の簡略化した浮力計算を提供します。副作用を持たない純粋関数のみで構成されます。
//!
//! - 目標浮力: 体重が重いほど中和に必要なバラストが比例して増える、という経験則を
//!   `体重 / 30` で近似したもの。実際の物理ではありません。
//! - 現在浮力: バラストは沈む方向（正）、フロート1個は -1.5kg の浮く方向に働きます。
//! - 判定: `|現在 - 目標| <= 2` を成功とします。境界は両端とも含みます。

use serde::Serialize;

use crate::models::common::{
    round_to_tenth, FLOATY_UNIT_KG, NEUTRAL_TOLERANCE_KG, TARGET_BUOYANCY_DIVISOR,
};
use crate::models::session::TrainingPhase;

/// 浮力テストの判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TestOutcome {
    Success,
    Fail,
}

/// 体重から目標浮力を計算（小数第1位で丸め）
pub fn target_buoyancy(body_weight_kg: f64) -> f64 {
    round_to_tenth(body_weight_kg / TARGET_BUOYANCY_DIVISOR)
}

/// バラストとフロート数から現在浮力を計算
pub fn current_buoyancy(added_weight_kg: f64, added_floaty_units: u32) -> f64 {
    added_weight_kg - FLOATY_UNIT_KG * f64::from(added_floaty_units)
}

/// 浮力差（現在 - 目標）を判定
pub fn classify(difference: f64) -> TestOutcome {
    classify_within(difference, NEUTRAL_TOLERANCE_KG)
}

/// 許容幅を指定して浮力差を判定
pub fn classify_within(difference: f64, tolerance_kg: f64) -> TestOutcome {
    if difference.abs() <= tolerance_kg {
        TestOutcome::Success
    } else {
        TestOutcome::Fail
    }
}

/// 表示用の水深（m）を計算
///
/// テスト中のみ浮力差に応じた段階的な深さを返します。それ以外のフェーズでは
/// 水面近くの待機位置（深度の10%）を返します。平滑化は描画側の責務です。
/// 中性帯の幅はテスト判定と同じ `tolerance_kg` を使います。
pub fn depth_fraction(
    phase: TrainingPhase,
    difference: f64,
    tolerance_kg: f64,
    pool_depth: f64,
) -> f64 {
    if phase != TrainingPhase::Testing {
        return pool_depth * 0.1;
    }

    let fraction = if difference > 10.0 {
        0.9
    } else if difference > tolerance_kg {
        0.6
    } else if difference.abs() <= tolerance_kg {
        0.4
    } else if difference < -10.0 {
        0.05
    } else if difference < -tolerance_kg {
        0.2
    } else {
        0.4
    };

    pool_depth * fraction
}

/// 浮力状態の表示区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuoyancyStatus {
    Neutral,
    SinkingFast,
    FloatingUp,
    SlightlyNegative,
    SlightlyPositive,
}

impl BuoyancyStatus {
    pub fn from_difference(difference: f64) -> Self {
        Self::from_difference_within(difference, NEUTRAL_TOLERANCE_KG)
    }

    /// 中性の許容幅を指定して区分
    pub fn from_difference_within(difference: f64, tolerance_kg: f64) -> Self {
        if difference.abs() <= tolerance_kg {
            BuoyancyStatus::Neutral
        } else if difference > 5.0 {
            BuoyancyStatus::SinkingFast
        } else if difference < -5.0 {
            BuoyancyStatus::FloatingUp
        } else if difference > 0.0 {
            BuoyancyStatus::SlightlyNegative
        } else {
            BuoyancyStatus::SlightlyPositive
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BuoyancyStatus::Neutral => "NEUTRAL BUOYANCY ACHIEVED!",
            BuoyancyStatus::SinkingFast => "TOO HEAVY - SINKING FAST",
            BuoyancyStatus::FloatingUp => "TOO LIGHT - FLOATING UP",
            BuoyancyStatus::SlightlyNegative => "SLIGHTLY NEGATIVE - SINKING",
            BuoyancyStatus::SlightlyPositive => "SLIGHTLY POSITIVE - FLOATING",
        }
    }
}
