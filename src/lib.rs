pub mod auth;
pub mod cli;
pub mod config;
pub mod context;
pub mod credentials;
pub mod document;
pub mod error;
pub mod service;
pub mod updater;
pub mod updates;

pub use config::Config;
pub use error::{Error, Result};
pub use updater::ConfigUpdater;
pub use updates::UpdateRequest;
