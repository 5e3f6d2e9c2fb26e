pub mod app;
pub mod clock;
pub mod config;
pub mod duration;
pub mod format;
pub mod ledger;
pub mod models;
pub mod source;
