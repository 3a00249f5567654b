//! Configuration, file-system paths and logging for the QTI clients.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{Config, DEFAULT_API_URL, DEFAULT_APP_ID, DEFAULT_LOG_LEVEL};
pub use error::{ConfigError, ConfigResult};
pub use logging::{init_logging, parse_level, FlushingWriter};
pub use paths::Paths;
