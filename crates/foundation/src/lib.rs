pub mod config;
pub mod error;
pub mod math;

pub use config::*;
pub use error::*;
