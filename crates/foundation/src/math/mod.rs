pub mod area;
pub mod geodesy;
pub mod local;
pub mod vec;

pub use area::*;
pub use geodesy::*;
pub use local::*;
pub use vec::*;
