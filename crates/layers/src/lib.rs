pub mod classify;
pub mod symbology;

pub use classify::*;
pub use symbology::*;
