use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ScenarioError;
use crate::models::common::{
    format_time, TrainingConstants, DEFAULT_BODY_WEIGHT_KG, MAX_BODY_WEIGHT_KG, MIN_BODY_WEIGHT_KG,
};
use crate::models::missions::{self, Mission};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    pub dt_s: f64,
    pub t_max_s: f64,
}

/// 宇宙飛行士の初期設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AstronautConfig {
    pub body_weight_kg: f64,
}

impl Default for AstronautConfig {
    fn default() -> Self {
        Self {
            body_weight_kg: DEFAULT_BODY_WEIGHT_KG,
        }
    }
}

/// 永続ストア設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    pub path: PathBuf,
}

/// 利用者操作
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    StartSession { body_weight_kg: f64 },
    AdjustWeight { delta_kg: f64 },
    AdjustFloaties { delta: i32 },
    RunTest,
    ResetSession,
    SelectMission { mission_id: String },
    StartMission,
    CompleteTask { task_id: u32 },
    LunarAdjustWeight { delta_kg: f64 },
    CollectRock { rock_id: u32 },
}

/// 指定時刻に実行する利用者操作
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScheduledAction {
    pub at_s: f64,
    #[serde(flatten)]
    pub action: Action,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub sim: SimulationConfig,
    #[serde(default)]
    pub astronaut: AstronautConfig,
    #[serde(default)]
    pub training: TrainingConstants,
    #[serde(default)]
    pub store: Option<StoreConfig>,
    /// 省略時は既定のミッションカタログを使用
    #[serde(default)]
    pub missions: Option<Vec<Mission>>,
    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        Self::from_yaml(&contents)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 使用するミッションカタログ
    pub fn mission_catalog(&self) -> Vec<Mission> {
        self.missions.clone().unwrap_or_else(missions::default_catalog)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        // 時間設定の検証（NaNや無限大は終了判定が成立しないため拒否）
        if !is_positive_finite(self.sim.dt_s) {
            return Err(ScenarioError::ValidationError(
                "dt_s must be a positive finite number".to_string(),
            ));
        }
        if !is_positive_finite(self.sim.t_max_s) {
            return Err(ScenarioError::ValidationError(
                "t_max_s must be a positive finite number".to_string(),
            ));
        }

        // 宇宙飛行士設定の検証
        let body_weight = self.astronaut.body_weight_kg;
        if !(MIN_BODY_WEIGHT_KG..=MAX_BODY_WEIGHT_KG).contains(&body_weight) {
            return Err(ScenarioError::ValidationError(format!(
                "body_weight_kg {} is outside {}..={}",
                body_weight, MIN_BODY_WEIGHT_KG, MAX_BODY_WEIGHT_KG
            )));
        }

        // 訓練パラメータの検証
        let training = &self.training;
        if !is_positive_finite(training.test_duration_s) {
            return Err(ScenarioError::ValidationError(
                "test_duration_s must be positive".to_string(),
            ));
        }
        if !training.tolerance_kg.is_finite()
            || training.tolerance_kg < 0.0
            || !is_positive_finite(training.pool_depth_m)
        {
            return Err(ScenarioError::ValidationError(
                "Invalid tolerance or pool depth".to_string(),
            ));
        }
        if !training.max_added_weight_kg.is_finite() || training.max_added_weight_kg < 0.0 {
            return Err(ScenarioError::ValidationError(
                "max_added_weight_kg must not be negative".to_string(),
            ));
        }

        if let Some(catalog) = &self.missions {
            Self::validate_catalog(catalog)?;
        }

        // 操作スケジュールの検証
        let mut previous = 0.0;
        for (index, scheduled) in self.actions.iter().enumerate() {
            if !scheduled.at_s.is_finite() || scheduled.at_s < 0.0 || scheduled.at_s < previous {
                return Err(ScenarioError::ValidationError(format!(
                    "Action #{} at {}s is out of order",
                    index, scheduled.at_s
                )));
            }
            if scheduled.at_s >= self.sim.t_max_s {
                return Err(ScenarioError::ValidationError(format!(
                    "Action #{} at {}s >= simulation time {}",
                    index, scheduled.at_s, self.sim.t_max_s
                )));
            }
            previous = scheduled.at_s;
        }

        Ok(())
    }

    fn validate_catalog(catalog: &[Mission]) -> Result<(), ScenarioError> {
        if catalog.is_empty() {
            return Err(ScenarioError::ValidationError("Mission catalog is empty".to_string()));
        }

        let mut ids = HashSet::new();
        for mission in catalog {
            if !ids.insert(mission.id.as_str()) {
                return Err(ScenarioError::ValidationError(format!(
                    "Duplicate mission id {}",
                    mission.id
                )));
            }
            if mission.duration_s == 0 || mission.tasks.is_empty() {
                return Err(ScenarioError::ValidationError(format!(
                    "Mission {} needs a duration and at least one task",
                    mission.id
                )));
            }
            for (index, task) in mission.tasks.iter().enumerate() {
                if task.id != index as u32 + 1 {
                    return Err(ScenarioError::ValidationError(format!(
                        "Mission {} task ids must be sequential from 1",
                        mission.id
                    )));
                }
                if task.points == 0 {
                    return Err(ScenarioError::ValidationError(format!(
                        "Mission {} task {} has no points",
                        mission.id, task.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒", self.sim.dt_s);
        println!("最大時間: {:.1}秒 ({:.1}分)", self.sim.t_max_s, self.sim.t_max_s / 60.0);
        println!("体重: {:.1}kg", self.astronaut.body_weight_kg);
        println!("テスト時間: {:.1}秒 / 許容幅: ±{:.1}kg", self.training.test_duration_s, self.training.tolerance_kg);
        match &self.store {
            Some(store) => println!("ストア: {}", store.path.display()),
            None => println!("ストア: メモリ（永続化なし）"),
        }
        println!();

        println!("=== ミッション ===");
        for mission in self.mission_catalog() {
            println!(
                "  {}: {} (タスク {}件, 制限 {}, 合計 {}pt)",
                mission.id,
                mission.title,
                mission.tasks.len(),
                format_time(mission.duration_s),
                mission.total_points()
            );
        }
        println!();

        println!("=== 操作スケジュール ===");
        println!("操作数: {}", self.actions.len());
    }
}

fn is_positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
meta:
  version: "1.0"
  name: minimal
sim:
  dt_s: 0.1
  t_max_s: 30.0
"#;

    #[test]
    fn test_minimal_scenario_uses_defaults() {
        let scenario = ScenarioConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(scenario.astronaut.body_weight_kg, 70.0);
        assert_eq!(scenario.training, TrainingConstants::default());
        assert!(scenario.store.is_none());
        assert_eq!(scenario.mission_catalog().len(), 3);
        assert!(scenario.actions.is_empty());
    }

    #[test]
    fn test_actions_parse() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
actions:
  - at_s: 0.0
    action: start_session
    body_weight_kg: 75.0
  - at_s: 0.5
    action: adjust_floaties
    delta: -1
  - at_s: 1.0
    action: run_test
  - at_s: 2.0
    action: select_mission
    mission_id: eva
  - at_s: 2.0
    action: complete_task
    task_id: 1
"#
        );
        let scenario = ScenarioConfig::from_yaml(&yaml).unwrap();
        assert_eq!(scenario.actions.len(), 5);
        assert_eq!(scenario.actions[0].action, Action::StartSession { body_weight_kg: 75.0 });
        assert_eq!(scenario.actions[1].action, Action::AdjustFloaties { delta: -1 });
        assert_eq!(scenario.actions[2].action, Action::RunTest);
        assert_eq!(
            scenario.actions[3].action,
            Action::SelectMission { mission_id: "eva".to_string() }
        );
        assert_eq!(scenario.actions[4].action, Action::CompleteTask { task_id: 1 });
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let yaml = MINIMAL.replace("dt_s: 0.1", "dt_s: 0.0");
        assert!(matches!(
            ScenarioConfig::from_yaml(&yaml),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_non_finite_times() {
        for yaml in [
            MINIMAL.replace("dt_s: 0.1", "dt_s: .nan"),
            MINIMAL.replace("t_max_s: 30.0", "t_max_s: .inf"),
            format!("{}actions:\n  - {{ at_s: .nan, action: run_test }}\n", MINIMAL),
            format!("{}actions:\n  - {{ at_s: .inf, action: run_test }}\n", MINIMAL),
        ] {
            assert!(
                matches!(
                    ScenarioConfig::from_yaml(&yaml),
                    Err(ScenarioError::ValidationError(_))
                ),
                "accepted:\n{}",
                yaml
            );
        }
    }

    #[test]
    fn test_rejects_body_weight_out_of_range() {
        for weight in ["500.0", "39.9", ".nan"] {
            let yaml = format!("{}astronaut:\n  body_weight_kg: {}\n", MINIMAL, weight);
            assert!(matches!(
                ScenarioConfig::from_yaml(&yaml),
                Err(ScenarioError::ValidationError(_))
            ));
        }

        let yaml = format!("{}astronaut:\n  body_weight_kg: 150.0\n", MINIMAL);
        assert_eq!(ScenarioConfig::from_yaml(&yaml).unwrap().astronaut.body_weight_kg, 150.0);
    }

    #[test]
    fn test_rejects_out_of_order_actions() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
actions:
  - at_s: 5.0
    action: run_test
  - at_s: 1.0
    action: run_test
"#
        );
        assert!(matches!(
            ScenarioConfig::from_yaml(&yaml),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_non_sequential_task_ids() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
missions:
  - id: drill
    title: Drill
    duration_s: 60
    tasks:
      - { id: 1, title: One, points: 5 }
      - { id: 3, title: Three, points: 5 }
"#
        );
        assert!(matches!(
            ScenarioConfig::from_yaml(&yaml),
            Err(ScenarioError::ValidationError(_))
        ));
    }

    #[test]
    fn test_custom_catalog() {
        let yaml = format!(
            "{}{}",
            MINIMAL,
            r#"
missions:
  - id: drill
    title: Drill
    duration_s: 60
    tasks:
      - { id: 1, title: One, points: 5 }
      - { id: 2, title: Two, points: 7 }
"#
        );
        let scenario = ScenarioConfig::from_yaml(&yaml).unwrap();
        let catalog = scenario.mission_catalog();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].total_points(), 12);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ScenarioConfig::from_file("does/not/exist.yaml"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
