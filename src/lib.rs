pub mod api;
pub mod app_state;
pub mod assets;
pub mod cache;
pub mod catalog;
pub mod clock;
pub mod company;
pub mod config;
pub mod errors;
pub mod models;
pub mod ordering;
pub mod showcase;
pub mod store;
pub mod sync;
