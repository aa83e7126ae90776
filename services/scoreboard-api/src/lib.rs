pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;

pub use config::Config;
pub use errors::{ApiError, Result};
