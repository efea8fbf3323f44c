pub mod glb;
pub mod overpass;

pub use glb::*;
pub use overpass::*;
