//! 中性浮力訓練シミュレーション (Neutral Buoyancy Lab Simulation)
//!
//! 浮力調整訓練、時間制限付きミッション、実績解除、訓練記録の永続化を
//! 時間刻み駆動で再現するライブラリです。

pub mod error;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
pub mod store;
