pub mod api;
pub mod app;
pub mod storage;
pub mod ui;
pub mod utils;
