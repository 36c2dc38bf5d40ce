pub mod actions;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod output;
pub mod start;
pub mod telemetry;
pub mod time;
