pub mod app;
pub mod booking;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod remote;
pub mod slots;
pub mod state;
pub mod storage;
pub mod sync;
pub mod ui;
pub mod views;

pub use app::router;
pub use config::Config;
pub use state::AppState;
