pub mod booking;
pub mod config;
pub mod error;
pub mod event;
pub mod traits;
pub mod types;
pub mod usage;

pub use config::AppConfig;
pub use error::{Result, WayfarerError};
pub use event::EventBus;
pub use types::*;
pub use usage::UsageMeter;
