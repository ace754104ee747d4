//! # 実績評価
//!
//! 累積統計から解除済みの実績を導出し、初回解除時に一度だけ通知を発行します。
//!
//! 解除状態は永続ストアに `achievement_<id> = "true"` として書き込まれ、
//! プロセスを再起動しても同じ実績の通知は再発行されません。
//! ストアが利用できない場合でも訓練処理は止めず、プロセス内の記録で重複通知を抑止します。

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    buoyancy::{self, TestOutcome},
    common::{TrainingConstants, NEUTRAL_TOLERANCE_KG},
    notification::Notification,
    progress::AstronautStats,
    traits::{IKeyValueStore, INotificationSink},
};
use crate::store::achievement_key;

/// 実績の識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    FirstNeutral,
    MissionComplete,
    Score100,
    ExpertTrainer,
}

impl AchievementId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementId::FirstNeutral => "first_neutral",
            AchievementId::MissionComplete => "mission_complete",
            AchievementId::Score100 => "score_100",
            AchievementId::ExpertTrainer => "expert_trainer",
        }
    }

    pub fn store_key(&self) -> String {
        achievement_key(self.as_str())
    }
}

/// 実績の解除条件
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AchievementRule {
    /// 現在浮力と目標浮力の差が許容幅以内
    NeutralBuoyancy { tolerance_kg: f64 },
    /// 完了ミッション数が閾値以上
    MissionsAtLeast(u32),
    /// 累積スコアが閾値以上
    ScoreAtLeast(u32),
}

impl AchievementRule {
    pub fn is_satisfied(&self, stats: &AstronautStats) -> bool {
        match *self {
            AchievementRule::NeutralBuoyancy { tolerance_kg } => {
                buoyancy::classify_within(stats.buoyancy_difference(), tolerance_kg)
                    == TestOutcome::Success
            }
            AchievementRule::MissionsAtLeast(min) => stats.completed_missions() >= min,
            AchievementRule::ScoreAtLeast(min) => stats.total_score() >= min,
        }
    }
}

/// 実績カタログの1項目
#[derive(Debug, Clone)]
pub struct Achievement {
    pub id: AchievementId,
    /// バッジ表示用のタイトル
    pub title: &'static str,
    /// バッジ表示用の説明
    pub description: &'static str,
    /// 解除通知のタイトル
    pub unlock_title: &'static str,
    /// 解除通知の本文
    pub unlock_message: &'static str,
    pub rule: AchievementRule,
}

/// 既定の実績カタログ（4件）
pub fn default_catalog() -> Vec<Achievement> {
    catalog_with_tolerance(NEUTRAL_TOLERANCE_KG)
}

/// 中性浮力の許容幅を訓練設定に合わせたカタログ
///
/// セッションの判定と同じ許容幅を渡すことで、テスト結果と実績が食い違わなくなります。
pub fn catalog_for(constants: &TrainingConstants) -> Vec<Achievement> {
    catalog_with_tolerance(constants.tolerance_kg)
}

fn catalog_with_tolerance(tolerance_kg: f64) -> Vec<Achievement> {
    vec![
        Achievement {
            id: AchievementId::FirstNeutral,
            title: "Neutral Buoyancy",
            description: "Achieve neutral buoyancy for the first time",
            unlock_title: "Neutral Buoyancy Achieved!",
            unlock_message: "You successfully achieved neutral buoyancy for the first time.",
            rule: AchievementRule::NeutralBuoyancy { tolerance_kg },
        },
        Achievement {
            id: AchievementId::MissionComplete,
            title: "Mission Specialist",
            description: "Complete your first training mission",
            unlock_title: "Mission Specialist",
            unlock_message: "Congratulations on completing your first training mission!",
            rule: AchievementRule::MissionsAtLeast(1),
        },
        Achievement {
            id: AchievementId::Score100,
            title: "Point Collector",
            description: "Earn 100 total points",
            unlock_title: "Point Collector",
            unlock_message: "You have earned 100 total points in training!",
            rule: AchievementRule::ScoreAtLeast(100),
        },
        Achievement {
            id: AchievementId::ExpertTrainer,
            title: "Expert Trainer",
            description: "Complete 5 training missions",
            unlock_title: "Expert Trainer",
            unlock_message: "Amazing! You have completed 5 training missions.",
            rule: AchievementRule::MissionsAtLeast(5),
        },
    ]
}

/// 実績評価器
#[derive(Debug, Clone)]
pub struct AchievementEvaluator {
    catalog: Vec<Achievement>,
    /// このプロセスで解除済みと確認した実績
    unlocked: HashSet<AchievementId>,
}

impl Default for AchievementEvaluator {
    fn default() -> Self {
        Self::new(default_catalog())
    }
}

impl AchievementEvaluator {
    pub fn new(catalog: Vec<Achievement>) -> Self {
        Self {
            catalog,
            unlocked: HashSet::new(),
        }
    }

    pub fn catalog(&self) -> &[Achievement] {
        &self.catalog
    }

    pub fn get(&self, id: AchievementId) -> Option<&Achievement> {
        self.catalog.iter().find(|a| a.id == id)
    }

    /// 統計を評価し、今回新たに解除された実績をカタログ順に返す
    pub fn evaluate(
        &mut self,
        stats: &AstronautStats,
        store: &mut dyn IKeyValueStore,
        sink: &mut dyn INotificationSink,
    ) -> Vec<AchievementId> {
        let mut newly_unlocked = Vec::new();

        for achievement in &self.catalog {
            if self.unlocked.contains(&achievement.id) || !achievement.rule.is_satisfied(stats) {
                continue;
            }

            let key = achievement.id.store_key();
            match store.get(&key) {
                Ok(Some(_)) => {
                    debug!("実績 {} は以前に解除済み", achievement.id.as_str());
                    self.unlocked.insert(achievement.id);
                    continue;
                }
                Ok(None) => {}
                Err(e) => warn!("実績状態の読み込みに失敗: {} ({})", key, e),
            }

            if let Err(e) = store.set(&key, "true") {
                warn!("実績状態の書き込みに失敗: {} ({})", key, e);
            }
            self.unlocked.insert(achievement.id);

            info!("実績解除: {}", achievement.title);
            sink.notify(Notification::achievement(
                achievement.unlock_title,
                achievement.unlock_message,
            ));
            newly_unlocked.push(achievement.id);
        }

        newly_unlocked
    }

    /// ストアに解除済みとして記録されている実績
    ///
    /// ストアを読めない場合はこのプロセスで解除した実績のみを返します。
    pub fn unlocked_ids(&self, store: &dyn IKeyValueStore) -> Vec<AchievementId> {
        self.catalog
            .iter()
            .filter(|a| {
                self.unlocked.contains(&a.id)
                    || matches!(store.get(&a.id.store_key()), Ok(Some(_)))
            })
            .map(|a| a.id)
            .collect()
    }
}
