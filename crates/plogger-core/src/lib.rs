pub mod config;
pub mod error;
pub mod types;

pub use config::PloggerConfig;
pub use error::{PloggerError, Result};
pub use types::*;
