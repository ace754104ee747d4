//! # Error モジュール
//!
//! シミュレーションで発生するエラー型を定義します。
//!
//! - [`Rejection`]: 利用者操作の検証エラー。状態は一切変更されません。
//! - [`StoreError`]: 永続ストアの読み書きエラー。
//! - [`ScenarioError`]: シナリオファイルの読み込み・検証エラー。

use std::path::PathBuf;
use thiserror::Error;

use crate::models::{LunarPhase, TrainingPhase};

/// 操作の却下理由
///
/// 不正な操作は例外ではなく値として呼び出し側に返されます。
/// 却下された操作は状態を変更しません。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("体重 {0:.1}kg は範囲外です (40〜150kg)")]
    BodyWeightOutOfRange(f64),

    #[error("フェーズ {phase:?} では操作 '{operation}' を実行できません")]
    IllegalTransition {
        phase: TrainingPhase,
        operation: &'static str,
    },

    #[error("未知のミッション: {0}")]
    UnknownMission(String),

    #[error("ミッション {mission_id} に タスク {task_id} は存在しません")]
    UnknownTask { mission_id: String, task_id: u32 },

    #[error("タスク {0} は既に完了しています")]
    TaskAlreadyCompleted(u32),

    #[error("タスク {requested} は順番外です (次のタスク: {expected})")]
    TaskOutOfOrder { requested: u32, expected: u32 },

    #[error("ミッション {0} は既に完了しています")]
    MissionAlreadyComplete(String),

    #[error("ミッション {0} のカウントダウンは既に進行中です")]
    CountdownAlreadyRunning(String),

    #[error("月面フェーズ {phase:?} では操作 '{operation}' を実行できません")]
    IllegalLunarOperation {
        phase: LunarPhase,
        operation: &'static str,
    },

    #[error("岩石 {0} は存在しないか既に回収済みです")]
    RockUnavailable(u32),
}

/// 永続ストアのエラー
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ストアファイル入出力エラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("ストアファイルのJSON解析エラー {}: {}", .0.display(), .1)]
    Json(PathBuf, #[source] serde_json::Error),

    #[error("ストアが利用できません: {0}")]
    Unavailable(String),
}

/// シナリオ読み込みエラー
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    IoError(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    ValidationError(String),

    #[error("ストア初期化エラー: {0}")]
    Store(#[from] StoreError),
}
