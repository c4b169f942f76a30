pub mod app;
pub mod config;
pub mod feeds;
pub mod format;
pub mod theme;
pub mod ui;
