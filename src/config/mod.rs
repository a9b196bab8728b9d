//! Configuration and path management
//!
//! The master encryption key is read once at startup and injected as an
//! explicit dependency; everything else (paths, PIN policy, default spend
//! limits) lives in a JSON settings file.

pub mod master_key;
pub mod paths;
pub mod settings;

pub use master_key::{MasterKey, MASTER_KEY_ENV};
pub use paths::VaultPaths;
pub use settings::Settings;
