pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod records;
pub mod server;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;

pub use error::{AppError, Result};
