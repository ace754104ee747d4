use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Rejection;
use crate::models::{
    common::{AgentEvent, TIME_EPSILON},
    progress::AstronautStats,
    traits::ITrainingAgent,
};

/// ミッション内のタスク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// 1から始まる連番
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub points: u32,
}

/// 訓練ミッション（静的カタログの1項目）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// 制限時間（秒）
    pub duration_s: u32,
    pub tasks: Vec<Task>,
}

impl Mission {
    pub fn task(&self, task_id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn total_points(&self) -> u32 {
        self.tasks.iter().map(|t| t.points).sum()
    }
}

fn task(id: u32, title: &str, details: &str, points: u32) -> Task {
    Task {
        id,
        title: title.to_string(),
        details: details.to_string(),
        points,
    }
}

/// 既定のミッションカタログ（3件）
pub fn default_catalog() -> Vec<Mission> {
    vec![
        Mission {
            id: "eva".to_string(),
            title: "EVA Simulation".to_string(),
            description: "Practice spacewalk procedures and tool handling".to_string(),
            duration_s: 180,
            tasks: vec![
                task(1, "Enter Airlock", "Practice entering and sealing the airlock", 10),
                task(2, "Tool Retrieval", "Collect required tools from storage", 15),
                task(3, "Component Repair", "Simulate repairing a station component", 25),
                task(4, "Exit Procedure", "Safely exit and secure equipment", 10),
            ],
        },
        Mission {
            id: "maintenance".to_string(),
            title: "ISS Maintenance".to_string(),
            description: "Perform routine maintenance tasks on station mockups".to_string(),
            duration_s: 240,
            tasks: vec![
                task(1, "System Check", "Inspect all systems for anomalies", 15),
                task(2, "Filter Replacement", "Replace air filtration components", 20),
                task(3, "Cable Management", "Organize and secure loose cables", 15),
                task(4, "Documentation", "Record all maintenance activities", 10),
            ],
        },
        Mission {
            id: "emergency".to_string(),
            title: "Emergency Response".to_string(),
            description: "Practice emergency procedures and rapid response".to_string(),
            duration_s: 120,
            tasks: vec![
                task(1, "Alarm Response", "Identify and respond to emergency alarm", 20),
                task(2, "Isolation Procedure", "Isolate affected systems quickly", 25),
                task(3, "Backup Activation", "Activate backup systems", 20),
                task(4, "Status Report", "Communicate status to mission control", 15),
            ],
        },
    ]
}

/// ミッションごとの進捗
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissionProgress {
    /// 完了したタスクID（完了順）
    pub completed_task_ids: Vec<u32>,
    /// このミッションで獲得したポイント
    pub score: u32,
}

impl MissionProgress {
    /// 次に完了すべきタスクID
    pub fn next_task_id(&self) -> u32 {
        self.completed_task_ids.len() as u32 + 1
    }
}

/// タスクの表示状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Completed,
    /// 次のタスクかつカウントダウン進行中
    Active,
    Pending,
}

/// ミッションのカウントダウン
///
/// 1秒ごとに残り時間を減らし、0で自動停止します。
/// タスク完了の可否には影響しない、表示上の制限時間です。
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    pub mission_id: String,
    pub remaining_s: u32,
    /// 1秒未満の経過時間
    elapsed_fraction_s: f64,
}

impl Countdown {
    fn new(mission_id: &str, duration_s: u32) -> Self {
        Self {
            mission_id: mission_id.to_string(),
            remaining_s: duration_s,
            elapsed_fraction_s: 0.0,
        }
    }

    /// 経過時間を進め、0に達した場合にtrueを返す
    fn advance(&mut self, dt: f64) -> bool {
        self.elapsed_fraction_s += dt;
        while self.remaining_s > 0 && self.elapsed_fraction_s + TIME_EPSILON >= 1.0 {
            self.elapsed_fraction_s -= 1.0;
            self.remaining_s -= 1;
        }
        self.remaining_s == 0
    }
}

/// ミッション・タスク進捗トラッカー
///
/// 選択中のミッションに対して順番どおりのタスク完了を受け付け、
/// ポイントを共有の統計記録に反映します。カウントダウンは常に高々1つで、
/// ミッションの切り替えや新規開始で破棄されます。
#[derive(Debug, Clone)]
pub struct MissionTaskTracker {
    catalog: Vec<Mission>,
    /// 選択中のミッションID
    selected: String,
    progress: HashMap<String, MissionProgress>,
    countdown: Option<Countdown>,
}

impl Default for MissionTaskTracker {
    fn default() -> Self {
        Self::new(default_catalog())
    }
}

impl MissionTaskTracker {
    /// カタログ先頭のミッションを選択した状態で作成
    pub fn new(catalog: Vec<Mission>) -> Self {
        let selected = catalog.first().map(|m| m.id.clone()).unwrap_or_default();
        Self {
            catalog,
            selected,
            progress: HashMap::new(),
            countdown: None,
        }
    }

    pub fn catalog(&self) -> &[Mission] {
        &self.catalog
    }

    pub fn mission(&self, mission_id: &str) -> Option<&Mission> {
        self.catalog.iter().find(|m| m.id == mission_id)
    }

    pub fn selected_mission(&self) -> Option<&Mission> {
        self.mission(&self.selected)
    }

    pub fn selected_id(&self) -> &str {
        &self.selected
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        self.countdown.as_ref()
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.countdown.as_ref().map(|c| c.remaining_s)
    }

    pub fn progress(&self, mission_id: &str) -> MissionProgress {
        self.progress.get(mission_id).cloned().unwrap_or_default()
    }

    /// 進捗率（%）
    pub fn progress_percent(&self, mission_id: &str) -> f64 {
        match self.mission(mission_id) {
            Some(mission) if !mission.tasks.is_empty() => {
                let completed = self.progress(mission_id).completed_task_ids.len();
                100.0 * completed as f64 / mission.tasks.len() as f64
            }
            _ => 0.0,
        }
    }

    pub fn is_complete(&self, mission_id: &str) -> bool {
        match self.mission(mission_id) {
            Some(mission) => {
                self.progress(mission_id).completed_task_ids.len() >= mission.tasks.len()
            }
            None => false,
        }
    }

    /// 全ミッションの進捗一覧（カタログ順）
    pub fn all_progress(&self) -> Vec<(String, MissionProgress)> {
        self.catalog
            .iter()
            .map(|m| (m.id.clone(), self.progress(&m.id)))
            .collect()
    }

    /// ミッションを選択
    ///
    /// 他のミッションの進捗は保持されます。実行中のカウントダウンは破棄されます。
    pub fn select_mission(&mut self, mission_id: &str) -> Result<(), Rejection> {
        if self.mission(mission_id).is_none() {
            return Err(Rejection::UnknownMission(mission_id.to_string()));
        }

        if self.selected != mission_id {
            if let Some(countdown) = self.countdown.take() {
                debug!("ミッション切り替えによりカウントダウンを破棄: {}", countdown.mission_id);
            }
            self.selected = mission_id.to_string();
        }
        debug!("ミッション選択: {}", mission_id);
        Ok(())
    }

    /// 選択中ミッションのカウントダウンを開始
    pub fn start_mission(&mut self) -> Result<(), Rejection> {
        let (mission_id, duration_s) = match self.selected_mission() {
            Some(mission) => (mission.id.clone(), mission.duration_s),
            None => return Err(Rejection::UnknownMission(self.selected.clone())),
        };

        if self.countdown.is_some() {
            return Err(Rejection::CountdownAlreadyRunning(mission_id));
        }
        if self.is_complete(&mission_id) {
            return Err(Rejection::MissionAlreadyComplete(mission_id));
        }

        info!("ミッション開始: {} (制限時間 {}秒)", mission_id, duration_s);
        self.countdown = Some(Countdown::new(&mission_id, duration_s));
        Ok(())
    }

    /// 選択中ミッションのタスクを完了
    ///
    /// 未完了かつ次の順番のタスクのみ受け付けます。カウントダウンの状態は問いません。
    pub fn complete_task(&mut self, stats: &mut AstronautStats, task_id: u32) -> Result<(), Rejection> {
        let mission = self
            .mission(&self.selected)
            .ok_or_else(|| Rejection::UnknownMission(self.selected.clone()))?;

        let points = mission
            .task(task_id)
            .map(|t| t.points)
            .ok_or_else(|| Rejection::UnknownTask {
                mission_id: mission.id.clone(),
                task_id,
            })?;
        let total_tasks = mission.tasks.len();

        let progress = self.progress.entry(self.selected.clone()).or_default();
        if progress.completed_task_ids.contains(&task_id) {
            return Err(Rejection::TaskAlreadyCompleted(task_id));
        }
        let expected = progress.next_task_id();
        if task_id != expected {
            return Err(Rejection::TaskOutOfOrder {
                requested: task_id,
                expected,
            });
        }

        progress.completed_task_ids.push(task_id);
        progress.score += points;
        let mission_complete = progress.completed_task_ids.len() == total_tasks;

        stats.record_task_completion(points, mission_complete);

        debug!("タスク完了: {} #{} (+{}pt)", self.selected, task_id, points);
        if mission_complete {
            info!("ミッション完了: {} (スコア {}pt)", self.selected, progress.score);
            self.countdown = None;
        }
        Ok(())
    }

    /// 選択中ミッションにおけるタスクの表示状態
    pub fn task_status(&self, task_id: u32) -> TaskStatus {
        let progress = self.progress(&self.selected);
        if progress.completed_task_ids.contains(&task_id) {
            TaskStatus::Completed
        } else if self.countdown.is_some() && progress.next_task_id() == task_id {
            TaskStatus::Active
        } else {
            TaskStatus::Pending
        }
    }
}

impl ITrainingAgent for MissionTaskTracker {
    fn tick(&mut self, dt: f64, _stats: &mut AstronautStats) -> Option<AgentEvent> {
        let countdown = self.countdown.as_mut()?;
        if countdown.advance(dt) {
            let mission_id = countdown.mission_id.clone();
            self.countdown = None;
            info!("ミッション {} の制限時間が終了", mission_id);
            return Some(AgentEvent::CountdownExpired { mission_id });
        }
        None
    }

    fn get_id(&self) -> String {
        "mission_tracker".to_string()
    }

    fn is_active(&self) -> bool {
        self.countdown.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_seconds(tracker: &mut MissionTaskTracker, stats: &mut AstronautStats, seconds: u32) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        for _ in 0..seconds * 10 {
            if let Some(event) = tracker.tick(0.1, stats) {
                events.push(event);
            }
        }
        events
    }

    #[test]
    fn test_default_catalog() {
        let catalog = default_catalog();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog[0].title, "EVA Simulation");
        assert_eq!(catalog[0].total_points(), 60);
        assert_eq!(catalog[1].duration_s, 240);
        assert_eq!(catalog[2].tasks[1].points, 25);
    }

    #[test]
    fn test_sequential_gating() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();

        assert_eq!(
            tracker.complete_task(&mut stats, 2),
            Err(Rejection::TaskOutOfOrder { requested: 2, expected: 1 })
        );
        assert_eq!(stats.total_score(), 0);

        tracker.complete_task(&mut stats, 1).unwrap();
        tracker.complete_task(&mut stats, 2).unwrap();
        assert_eq!(tracker.progress("eva").score, 25);
        assert_eq!(tracker.progress("eva").completed_task_ids, vec![1, 2]);

        assert_eq!(tracker.complete_task(&mut stats, 1), Err(Rejection::TaskAlreadyCompleted(1)));
        assert!(matches!(
            tracker.complete_task(&mut stats, 9),
            Err(Rejection::UnknownTask { .. })
        ));
    }

    #[test]
    fn test_eva_mission_completion() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();

        tracker.complete_task(&mut stats, 1).unwrap();
        tracker.complete_task(&mut stats, 2).unwrap();
        assert_eq!(stats.total_score(), 25);
        assert_eq!(stats.completed_missions(), 0);
        assert_eq!(tracker.progress_percent("eva"), 50.0);

        tracker.complete_task(&mut stats, 3).unwrap();
        tracker.complete_task(&mut stats, 4).unwrap();
        assert_eq!(stats.total_score(), 60);
        assert_eq!(stats.completed_missions(), 1);
        assert_eq!(tracker.progress_percent("eva"), 100.0);
        assert!(tracker.is_complete("eva"));
    }

    #[test]
    fn test_completed_mission_cannot_restart() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        for id in 1..=4 {
            tracker.complete_task(&mut stats, id).unwrap();
        }

        tracker.select_mission("maintenance").unwrap();
        tracker.select_mission("eva").unwrap();
        assert_eq!(tracker.progress_percent("eva"), 100.0);
        assert_eq!(
            tracker.start_mission(),
            Err(Rejection::MissionAlreadyComplete("eva".to_string()))
        );
        assert_eq!(stats.completed_missions(), 1);
    }

    #[test]
    fn test_progress_retained_across_selection() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        tracker.complete_task(&mut stats, 1).unwrap();

        tracker.select_mission("emergency").unwrap();
        tracker.complete_task(&mut stats, 1).unwrap();
        assert_eq!(tracker.progress("emergency").score, 20);

        tracker.select_mission("eva").unwrap();
        assert_eq!(tracker.progress("eva").completed_task_ids, vec![1]);
        assert_eq!(stats.total_score(), 30);
    }

    #[test]
    fn test_unknown_mission_rejected() {
        let mut tracker = MissionTaskTracker::default();
        assert_eq!(
            tracker.select_mission("lunar"),
            Err(Rejection::UnknownMission("lunar".to_string()))
        );
        assert_eq!(tracker.selected_id(), "eva");
    }

    #[test]
    fn test_start_mission_is_idempotent() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        tracker.start_mission().unwrap();
        tick_seconds(&mut tracker, &mut stats, 10);

        assert_eq!(
            tracker.start_mission(),
            Err(Rejection::CountdownAlreadyRunning("eva".to_string()))
        );
        assert_eq!(tracker.remaining_seconds(), Some(170));
    }

    #[test]
    fn test_countdown_expires_once() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        tracker.select_mission("emergency").unwrap();
        tracker.start_mission().unwrap();

        let events = tick_seconds(&mut tracker, &mut stats, 130);
        assert_eq!(
            events,
            vec![AgentEvent::CountdownExpired { mission_id: "emergency".to_string() }]
        );
        assert!(tracker.countdown().is_none());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_task_completion_allowed_after_expiry() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        tracker.select_mission("emergency").unwrap();
        tracker.start_mission().unwrap();
        tick_seconds(&mut tracker, &mut stats, 121);

        tracker.complete_task(&mut stats, 1).unwrap();
        assert_eq!(stats.total_score(), 20);
    }

    #[test]
    fn test_mission_switch_leaves_no_countdown() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();

        tracker.start_mission().unwrap();
        tracker.select_mission("maintenance").unwrap();
        assert!(tracker.countdown().is_none());

        tracker.start_mission().unwrap();
        tracker.select_mission("emergency").unwrap();
        tracker.start_mission().unwrap();
        assert_eq!(tracker.countdown().map(|c| c.mission_id.as_str()), Some("emergency"));

        let events = tick_seconds(&mut tracker, &mut stats, 300);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_task_status() {
        let mut tracker = MissionTaskTracker::default();
        let mut stats = AstronautStats::default();
        assert_eq!(tracker.task_status(1), TaskStatus::Pending);

        tracker.start_mission().unwrap();
        assert_eq!(tracker.task_status(1), TaskStatus::Active);
        tracker.complete_task(&mut stats, 1).unwrap();
        assert_eq!(tracker.task_status(1), TaskStatus::Completed);
        assert_eq!(tracker.task_status(2), TaskStatus::Active);
        assert_eq!(tracker.task_status(3), TaskStatus::Pending);
    }
}
