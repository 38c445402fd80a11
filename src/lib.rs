pub mod api;
pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod predict;
pub mod request;
pub mod results;
pub mod state;
pub mod tasks;
pub mod ui;
pub mod upload;
