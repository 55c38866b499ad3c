pub mod app;
pub mod cli;
pub mod models;
pub mod source;
pub mod storage;
pub mod tree;
pub mod ui;
