//! CLI command implementations.

pub mod activity;
pub mod goal;
pub mod group;
pub mod init;
pub mod leaderboard;
pub mod maintenance;
pub mod progress;
pub mod user;
