pub mod commands;
pub mod config;
pub mod console;
pub mod context;

pub use commands::{run, Command};
pub use config::{load_app_settings, AppSettings, Scope};
pub use context::AppContext;
