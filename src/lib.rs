pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod market;
pub mod mining;
pub mod simulate;
pub mod state;
pub mod ui;

pub use error::AppError;
