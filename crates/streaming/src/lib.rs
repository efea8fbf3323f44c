pub mod data_sources;
pub mod query;

pub use data_sources::*;
pub use query::*;
