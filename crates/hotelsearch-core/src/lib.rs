pub mod config;
pub mod error;
pub mod types;

pub use config::HotelSearchConfig;
pub use error::{HotelSearchError, Result};
pub use types::*;
