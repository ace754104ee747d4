//! # Simulation モジュール
//!
//! 中性浮力訓練シミュレーションの中核となるエンジンを提供します。
//!
//! エンジンは訓練画面に相当し、共有の統計記録 [`AstronautStats`] を単独で所有します。
//! 浮力セッション・ミッショントラッカー・月面シミュレーションには可変参照として渡し、
//! 統計が変化するたびに実績評価器を呼び出して一度限りの解除通知を発行します。
//!
//! ## 時間の扱い
//!
//! 固定時間刻み（Δt）で全エージェントの `tick` を呼び出します。浮力テストの4秒間、
//! ミッションの1秒ごとのカウントダウン、月面降下はすべてこの刻みで進行します。
//! 単一の論理スレッドで動作するため、統計の更新が途中で割り込まれることはありません。
//!
//! ## 各時間刻みの処理順序
//!
//! 1. **操作処理**: 現在時刻までに予定された利用者操作を適用
//! 2. **浮力セッション処理**: テストの残り時間を進め、完了時に判定
//! 3. **ミッション処理**: カウントダウンを進める
//! 4. **月面処理**: 降下を進める
//! 5. **実績評価**: 統計が変化していれば評価
//!
//! ## 使用例
//!
//! ```no_run
//! use nblsim::scenario::ScenarioConfig;
//! use nblsim::simulation::SimulationEngine;
//!
//! let config = ScenarioConfig::from_file("scenarios/buoyancy_basic.yaml")?;
//! let mut engine = SimulationEngine::from_scenario(config, 1)?;
//! let report = engine.run();
//! report.print_summary();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::error::{Rejection, ScenarioError};
use crate::models::achievements;
use crate::models::*;
use crate::scenario::{Action, ScenarioConfig, ScheduledAction};
use crate::store::{JsonFileStore, MemoryStore};

/// 実時間実行の1刻みあたりの最短待ち時間
const MIN_REALTIME_PERIOD: Duration = Duration::from_millis(1);

pub struct SimulationEngine {
    pub current_time: f64,
    pub dt: f64,
    pub max_time: f64,
    pub step_count: u64,

    pub stats: AstronautStats,
    pub session: TrainingSession,
    pub tracker: MissionTaskTracker,
    pub lunar: LunarSimulation,
    pub evaluator: AchievementEvaluator,

    store: Box<dyn IKeyValueStore>,
    sink: Box<dyn INotificationSink>,

    pending_actions: VecDeque<ScheduledAction>,
    /// 最後に実績評価した時点の統計リビジョン
    evaluated_revision: u64,
    unlocked_this_run: Vec<AchievementId>,
    events: Vec<(f64, AgentEvent)>,
    rejections: Vec<(f64, Rejection)>,

    pub verbose_level: u8,
}

impl SimulationEngine {
    pub fn new(
        scenario: &ScenarioConfig,
        store: Box<dyn IKeyValueStore>,
        sink: Box<dyn INotificationSink>,
        verbose_level: u8,
    ) -> Self {
        let mut engine = Self {
            current_time: 0.0,
            dt: scenario.sim.dt_s,
            max_time: scenario.sim.t_max_s,
            step_count: 0,
            stats: AstronautStats::new(scenario.astronaut.body_weight_kg),
            session: TrainingSession::new(scenario.training),
            tracker: MissionTaskTracker::new(scenario.mission_catalog()),
            lunar: LunarSimulation::new(),
            evaluator: AchievementEvaluator::new(achievements::catalog_for(&scenario.training)),
            store,
            sink,
            pending_actions: scenario.actions.iter().cloned().collect(),
            evaluated_revision: 0,
            unlocked_this_run: Vec::new(),
            events: Vec::new(),
            rejections: Vec::new(),
            verbose_level,
        };
        // 初期状態で既に満たしている実績も評価
        engine.force_evaluate_achievements();
        engine
    }

    /// シナリオのストア設定に従ってエンジンを作成（通知はログへ出力）
    pub fn from_scenario(scenario: ScenarioConfig, verbose_level: u8) -> Result<Self, ScenarioError> {
        let store: Box<dyn IKeyValueStore> = match &scenario.store {
            Some(config) => Box::new(JsonFileStore::open(&config.path)?),
            None => Box::new(MemoryStore::new()),
        };

        if verbose_level > 1 {
            debug!(
                "エンジン初期化: 体重 {:.1}kg, ミッション {}件, 操作 {}件",
                scenario.astronaut.body_weight_kg,
                scenario.mission_catalog().len(),
                scenario.actions.len()
            );
        }

        Ok(Self::new(&scenario, store, Box::new(LogSink), verbose_level))
    }

    pub fn store(&self) -> &dyn IKeyValueStore {
        self.store.as_ref()
    }

    pub fn rejections(&self) -> &[(f64, Rejection)] {
        &self.rejections
    }

    pub fn events(&self) -> &[(f64, AgentEvent)] {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.current_time + TIME_EPSILON >= self.max_time
    }

    /// 利用者操作を即時に適用
    ///
    /// 却下された操作は状態を変更せず、理由を返します。
    pub fn apply(&mut self, action: &Action) -> Result<(), Rejection> {
        let result = match action {
            Action::StartSession { body_weight_kg } => self.session.start(&mut self.stats, *body_weight_kg),
            Action::AdjustWeight { delta_kg } => self.session.adjust_weight(&mut self.stats, *delta_kg),
            Action::AdjustFloaties { delta } => self.session.adjust_floaties(&mut self.stats, *delta),
            Action::RunTest => self.session.run_test(),
            Action::ResetSession => self.session.reset(&mut self.stats),
            Action::SelectMission { mission_id } => self.tracker.select_mission(mission_id),
            Action::StartMission => self.tracker.start_mission(),
            Action::CompleteTask { task_id } => self.tracker.complete_task(&mut self.stats, *task_id),
            Action::LunarAdjustWeight { delta_kg } => self.lunar.adjust_weight(*delta_kg),
            Action::CollectRock { rock_id } => self.lunar.collect_rock(&mut self.stats, *rock_id),
        };

        match &result {
            Ok(()) => {
                if self.verbose_level > 1 {
                    debug!("操作適用 t={:.1}s: {:?}", self.current_time, action);
                }
            }
            Err(rejection) => {
                warn!("操作却下 t={:.1}s: {:?} ({})", self.current_time, action, rejection);
                self.rejections.push((self.current_time, rejection.clone()));
            }
        }

        self.evaluate_achievements();
        result
    }

    /// 統計が前回評価時から変化していれば実績を評価
    fn evaluate_achievements(&mut self) {
        if self.stats.revision() == self.evaluated_revision {
            return;
        }
        self.force_evaluate_achievements();
    }

    fn force_evaluate_achievements(&mut self) {
        self.evaluated_revision = self.stats.revision();

        let unlocked = self
            .evaluator
            .evaluate(&self.stats, self.store.as_mut(), self.sink.as_mut());
        self.unlocked_this_run.extend(unlocked);
    }

    /// 1時間刻み分の処理を実行
    pub fn step(&mut self) {
        self.process_actions();

        let dt = self.dt;
        let mut events = Vec::new();
        let agents: [&mut dyn ITrainingAgent; 3] = [&mut self.session, &mut self.tracker, &mut self.lunar];
        for agent in agents {
            if self.verbose_level > 2 && agent.is_active() {
                trace!("稼働中: {}", agent.get_id());
            }
            if let Some(event) = agent.tick(dt, &mut self.stats) {
                if self.verbose_level > 1 {
                    debug!("{} からのイベント: {:?}", agent.get_id(), event);
                }
                events.push(event);
            }
        }
        self.evaluate_achievements();

        self.current_time += dt;
        self.step_count += 1;

        for event in events {
            if self.verbose_level > 0 {
                info!("イベント t={:.1}s: {:?}", self.current_time, event);
            }
            self.events.push((self.current_time, event));
        }
    }

    fn process_actions(&mut self) {
        while let Some(next) = self.pending_actions.front() {
            if next.at_s > self.current_time + TIME_EPSILON {
                break;
            }
            if let Some(scheduled) = self.pending_actions.pop_front() {
                // 却下はapply内で記録済み
                let _ = self.apply(&scheduled.action);
            }
        }
    }

    /// 最大時間まで可能な限り高速に実行
    pub fn run(&mut self) -> RunReport {
        info!("=== シミュレーション実行開始 ===");

        while !self.is_finished() {
            self.step();

            if self.verbose_level > 2 {
                trace!("時刻: {:.1}秒 (ステップ: {})", self.current_time, self.step_count);
            }
            if self.step_count % 100 == 0 && self.verbose_level > 0 {
                let progress = (self.current_time / self.max_time) * 100.0;
                info!("進行状況: {:.1}% ({:.1}/{:.1}秒)", progress, self.current_time, self.max_time);
            }
        }

        self.finish()
    }

    /// 実時間に合わせて実行（speed倍速）
    ///
    /// tokioのintervalで各時間刻みを駆動します。タイマーはこの関数の終了とともに破棄されます。
    /// 正の有限値でない倍速は等速として扱い、待ち時間は1ms未満にしません。
    pub async fn run_realtime(&mut self, speed: f64) -> RunReport {
        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            warn!("倍速 {} は無効です。等速で実行します", speed);
            1.0
        };
        let period = Duration::try_from_secs_f64(self.dt / speed)
            .unwrap_or(MIN_REALTIME_PERIOD)
            .max(MIN_REALTIME_PERIOD);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);

        info!("=== シミュレーション実行開始 (実時間 x{:.1}) ===", speed);

        while !self.is_finished() {
            interval.tick().await;
            self.step();
        }

        self.finish()
    }

    fn finish(&self) -> RunReport {
        let report = self.report();
        info!("=== シミュレーション完了 ===");
        info!("実行時間: {:.1}秒", self.current_time);
        info!("総ステップ数: {}", self.step_count);
        info!(
            "スコア: {}pt / 完了ミッション: {} / 解除実績: {}件",
            report.total_score,
            report.completed_missions,
            report.unlocked_this_run.len()
        );
        report
    }

    /// 現時点の実行結果
    pub fn report(&self) -> RunReport {
        RunReport {
            simulated_time_s: self.current_time,
            steps: self.step_count,
            total_score: self.stats.total_score(),
            completed_missions: self.stats.completed_missions(),
            body_weight_kg: self.stats.body_weight_kg(),
            target_buoyancy_kg: self.stats.target_buoyancy(),
            current_buoyancy_kg: self.stats.current_buoyancy(),
            session_phase: self.session.phase(),
            session_result: self.session.result(),
            tests_completed: self.session.tests_completed(),
            missions: self
                .tracker
                .all_progress()
                .into_iter()
                .map(|(mission_id, progress)| MissionReport {
                    percent: self.tracker.progress_percent(&mission_id),
                    mission_id,
                    score: progress.score,
                    completed_task_ids: progress.completed_task_ids,
                })
                .collect(),
            lunar_phase: self.lunar.phase(),
            unlocked_this_run: self.unlocked_this_run.clone(),
            unlocked_total: self.evaluator.unlocked_ids(self.store.as_ref()),
            buoyancy_skill_percent: self.stats.buoyancy_skill_percent(),
            mission_experience_percent: self.stats.mission_experience_percent(),
            rejected_actions: self.rejections.len(),
        }
    }
}

/// ミッション別の結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionReport {
    pub mission_id: String,
    pub score: u32,
    pub completed_task_ids: Vec<u32>,
    pub percent: f64,
}

/// 実行結果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub simulated_time_s: f64,
    pub steps: u64,
    pub total_score: u32,
    pub completed_missions: u32,
    pub body_weight_kg: f64,
    pub target_buoyancy_kg: f64,
    pub current_buoyancy_kg: f64,
    pub session_phase: TrainingPhase,
    pub session_result: Option<TestOutcome>,
    pub tests_completed: u32,
    pub missions: Vec<MissionReport>,
    pub lunar_phase: LunarPhase,
    pub unlocked_this_run: Vec<AchievementId>,
    pub unlocked_total: Vec<AchievementId>,
    pub buoyancy_skill_percent: f64,
    pub mission_experience_percent: f64,
    pub rejected_actions: usize,
}

impl RunReport {
    pub fn print_summary(&self) {
        println!("=== 実行結果 ===");
        println!("経過時間: {:.1}秒 ({}ステップ)", self.simulated_time_s, self.steps);
        println!("累積スコア: {}pt", self.total_score);
        println!("完了ミッション: {}", self.completed_missions);
        println!();

        println!("=== 浮力訓練 ===");
        println!("体重: {:.1}kg", self.body_weight_kg);
        println!(
            "目標浮力: {:.1}kg / 現在浮力: {:.1}kg",
            self.target_buoyancy_kg, self.current_buoyancy_kg
        );
        println!("フェーズ: {:?} / 結果: {:?}", self.session_phase, self.session_result);
        println!("テスト回数: {}", self.tests_completed);
        println!();

        println!("=== ミッション進捗 ===");
        for mission in &self.missions {
            println!(
                "  {}: {:.0}% ({}pt) 完了タスク {:?}",
                mission.mission_id, mission.percent, mission.score, mission.completed_task_ids
            );
        }
        println!("月面シミュレーション: {:?}", self.lunar_phase);
        println!();

        println!("=== スキル ===");
        println!("浮力制御: {:.0}%", self.buoyancy_skill_percent);
        println!("ミッション経験: {:.0}%", self.mission_experience_percent);
        println!();

        println!("=== 実績 ===");
        println!("今回解除: {:?}", self.unlocked_this_run);
        println!("解除済み合計: {:?}", self.unlocked_total);
        if self.rejected_actions > 0 {
            println!("却下された操作: {}件", self.rejected_actions);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(yaml_actions: &str) -> SimulationEngine {
        engine_with_sections("", yaml_actions)
    }

    /// `sections` はactionsの前に挿入するYAML（astronaut, trainingなど）
    fn engine_with_sections(sections: &str, yaml_actions: &str) -> SimulationEngine {
        let yaml = format!(
            r#"
meta:
  version: "1.0"
  name: test
sim:
  dt_s: 0.1
  t_max_s: 20.0
{}
actions:
{}
"#,
            sections, yaml_actions
        );
        let scenario = ScenarioConfig::from_yaml(&yaml).unwrap();
        SimulationEngine::new(
            &scenario,
            Box::new(MemoryStore::new()),
            Box::new(RecordingSink::new()),
            0,
        )
    }

    #[test]
    fn test_scheduled_actions_apply_in_time() {
        let mut engine = engine_with(
            r#"
  - at_s: 0.0
    action: start_session
    body_weight_kg: 75.0
  - at_s: 1.0
    action: adjust_weight
    delta_kg: 2.0
"#,
        );

        engine.step();
        assert_eq!(engine.session.phase(), TrainingPhase::Adjust);
        assert_eq!(engine.stats.added_weight_kg(), 0.0);

        while engine.current_time < 1.05 {
            engine.step();
        }
        assert_eq!(engine.stats.added_weight_kg(), 2.0);
    }

    #[test]
    fn test_rejected_action_is_recorded() {
        let mut engine = engine_with(
            r#"
  - at_s: 0.0
    action: run_test
"#,
        );
        engine.step();
        assert_eq!(engine.rejections().len(), 1);
        assert_eq!(engine.session.phase(), TrainingPhase::Setup);
    }

    #[test]
    fn test_run_stops_at_max_time() {
        let mut engine = engine_with("  []");
        let report = engine.run();
        assert_eq!(report.steps, 200);
        assert!((report.simulated_time_s - 20.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_matches_fast_run() {
        let actions = r#"
  - at_s: 0.0
    action: start_session
    body_weight_kg: 75.0
  - at_s: 0.2
    action: adjust_weight
    delta_kg: 2.0
  - at_s: 0.3
    action: adjust_floaties
    delta: 1
  - at_s: 0.5
    action: run_test
"#;
        let fast = engine_with(actions).run();

        let started = tokio::time::Instant::now();
        let realtime = engine_with(actions).run_realtime(4.0).await;

        assert_eq!(realtime, fast);
        assert_eq!(realtime.session_result, Some(TestOutcome::Success));
        // 20秒分を4倍速で実行
        assert!(started.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_run_survives_extreme_speed() {
        let fast = engine_with("  []").run();

        let started = tokio::time::Instant::now();
        let report = engine_with("  []").run_realtime(1e12).await;
        assert_eq!(report, fast);
        // 1刻みあたり最短1ms
        assert!(started.elapsed() >= Duration::from_millis(199));

        for speed in [f64::INFINITY, f64::NAN, -2.0] {
            let started = tokio::time::Instant::now();
            let report = engine_with("  []").run_realtime(speed).await;
            assert_eq!(report, fast);
            // 等速にフォールバック
            assert!(started.elapsed() >= Duration::from_secs(19));
        }
    }

    #[test]
    fn test_training_tolerance_shared_by_verdict_and_achievement() {
        let mut engine = engine_with_sections(
            "training:\n  tolerance_kg: 0.5",
            r#"
  - { at_s: 0.0, action: start_session, body_weight_kg: 75.0 }
  - { at_s: 0.2, action: adjust_weight, delta_kg: 2.0 }
  - { at_s: 0.3, action: adjust_floaties, delta: 1 }
  - { at_s: 0.5, action: run_test }
"#,
        );
        let report = engine.run();

        assert_eq!(report.session_result, Some(TestOutcome::Fail));
        assert!(!report.unlocked_this_run.contains(&AchievementId::FirstNeutral));
        assert_eq!(engine.session.status(&engine.stats), BuoyancyStatus::SlightlyPositive);
    }

    #[test]
    fn test_initial_stats_are_evaluated_on_construction() {
        // 55kg: 目標1.8kg, バラストなしで差 -1.8kg
        let engine = engine_with_sections("astronaut:\n  body_weight_kg: 55.0", "  []");
        assert_eq!(engine.report().unlocked_this_run, vec![AchievementId::FirstNeutral]);
        assert_eq!(engine.store().get("achievement_first_neutral").unwrap(), Some("true".to_string()));

        let fresh = engine_with("  []");
        assert!(fresh.report().unlocked_this_run.is_empty());
    }

    #[test]
    fn test_achievement_evaluated_after_direct_apply() {
        let mut engine = engine_with("  []");
        engine.apply(&Action::CompleteTask { task_id: 1 }).unwrap();
        assert!(engine.report().unlocked_this_run.is_empty());

        for task_id in 2..=4 {
            engine.apply(&Action::CompleteTask { task_id }).unwrap();
        }
        assert_eq!(engine.report().unlocked_this_run, vec![AchievementId::MissionComplete]);
    }
}
