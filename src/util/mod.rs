pub mod error;
pub mod logging;

pub use error::{ConfigError, SessionError};
pub use logging::init_logging;
