pub mod config;
pub mod logging;

pub use config::{ConfigLoader, InjectorConfig, CONFIG_FILE_NAME};
pub use logging::{init_logging, try_init_test_logging, LoggingConfig, StructuredLogEntry};
