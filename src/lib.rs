pub mod autosave;
pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod logging;
pub mod model;
pub mod storage;
pub mod store;
pub mod ui;
