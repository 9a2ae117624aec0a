pub mod config;

pub use config::{ConfigManager, UserConfig};
