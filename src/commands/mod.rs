//! CLI commands for coachbench

pub mod control;
pub mod dispatch;
pub mod leaderboard;
pub mod render;
pub mod run;
pub mod scenarios;
