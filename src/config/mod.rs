//! Configuration management module
//!
//! Responsible for loading and managing application configuration, including environment variables and the optional client file

pub mod file;
pub mod settings;

pub use file::ClientFile;
pub use settings::{Settings, DEFAULT_MODEL, DEFAULT_REGIONS};
