pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use error::{FieldmarkError, Result};
