pub mod api;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod init;
pub mod passcode;
pub mod state;
pub mod store;

pub use error::{BlockerError, Result};
