pub mod api;
pub mod app;
pub mod book;
pub mod csv;
pub mod guard;
pub mod query;
pub mod storage;
pub mod store;
pub mod sync;
pub mod ui;
pub mod utils;
